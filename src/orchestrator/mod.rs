//! 编排层
//!
//! 职责边界：
//! - `batch_extractor`：并发调度一批题目块，聚合成功与失败
//! - `upload_processor`：应用入口，扫描上传文件并驱动完整流程
//!
//! 编排层只做调度与聚合，单个块/图片怎么提取由 workflow 层决定。

pub mod batch_extractor;
pub mod upload_processor;

pub use batch_extractor::BatchExtractor;
pub use upload_processor::App;
