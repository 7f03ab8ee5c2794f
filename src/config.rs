/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时在途的 LLM 请求数量
    pub max_concurrent_requests: usize,
    /// 单个题目块的重试次数（解析失败/调用失败后原样重发）
    pub max_retries: usize,
    /// 单次 LLM 调用超时（秒），超时转为该题目块的失败记录
    pub request_timeout_secs: u64,
    /// 待处理文件存放目录（PDF / 图片）
    pub input_folder: String,
    /// 提取结果 JSON 输出目录
    pub output_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 对象存储配置（可选，留空则跳过原始文件归档） ---
    pub storage_upload_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            max_retries: 1,
            request_timeout_secs: 30,
            input_folder: "uploads".to_string(),
            output_folder: "parsed".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gemini-1.5-flash".to_string(),
            storage_upload_url: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_requests: std::env::var("MAX_CONCURRENT_REQUESTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_requests),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            input_folder: std::env::var("INPUT_FOLDER").unwrap_or(default.input_folder),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            storage_upload_url: std::env::var("STORAGE_UPLOAD_URL").unwrap_or(default.storage_upload_url),
        }
    }
}
