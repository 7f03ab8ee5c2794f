use anyhow::Result;

use question_extract::orchestrator::App;
use question_extract::utils::logging;
use question_extract::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
