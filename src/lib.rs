//! # Question Extract
//!
//! 一个把杂乱来源（PDF、截图、整页试卷图）中的考试题目
//! 提取为结构化 JSON 的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 持有外部连接，只暴露能力
//! - `LlmClient` - 文本/视觉补全能力（CompletionService 的生产实现）
//! - `StorageClient` - 原始文件归档能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，纯函数、无 IO
//! - `json_recover` - 模型输出归一化与 JSON 恢复
//! - `normalizer` - 结构校验与字段纠偏
//! - `merger` - 题目与答案键按题号合并
//! - `document` - PDF 抽文本与题目块切分
//! - `prompts` - 各类提取任务的提示词模板
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个题目块 / 一张图片"的完整提取流程
//! - `BlockCtx` - 上下文封装（upload_id + source_index）
//! - `ExtractFlow` - 流程编排（调模型 → 恢复 → 校验，带重试与超时）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_extractor` - 批量提取器，管理并发与失败隔离
//! - `orchestrator/upload_processor` - 上传处理器，扫描文件并驱动全流程

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{CompletionRequest, CompletionService, LlmClient, StorageClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::batch::{BatchOutcome, ExtractionFailure, RawQuestionBlock};
pub use models::question::{AnswerKeyEntry, ExtractedQuestion, MergedQuestion};
pub use models::session::SessionStore;
pub use orchestrator::{App, BatchExtractor};
pub use workflow::{BlockCtx, ExtractFlow};
