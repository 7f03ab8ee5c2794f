//! 提取流程 - 流程层
//!
//! 核心职责：定义"一个题目块 / 一张图片"的完整提取流程
//!
//! 流程顺序：
//! 1. 选模板 → 调模型（带超时）
//! 2. 归一化文本 → 恢复 JSON → 宽松解析
//! 3. 结构校验 → 完整记录
//!
//! 调用失败或解析失败时按上限原样重发提示词；上限用尽后错误上抛，
//! 由编排层转成失败记录，不中断同批次其他块。

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clients::{CompletionRequest, CompletionService};
use crate::config::Config;
use crate::error::{AppError, AppResult, ExtractError, LlmError};
use crate::models::question::{AnswerKeyEntry, ExtractedQuestion};
use crate::services::json_recover::{parse_relaxed, JsonShape};
use crate::services::normalizer::{normalize_answer_key, normalize_question};
use crate::services::prompts;
use crate::utils::logging::truncate_text;
use crate::workflow::block_ctx::BlockCtx;

/// 提取流程
///
/// - 编排单个块/图片的完整提取流程
/// - 决定何时调模型、何时重试、何时放弃
/// - 不持有批次状态，也不关心块之间的顺序
pub struct ExtractFlow<S> {
    service: S,
    max_retries: usize,
    request_timeout_secs: u64,
}

impl<S: CompletionService> ExtractFlow<S> {
    /// 创建新的提取流程
    pub fn new(service: S, config: &Config) -> Self {
        Self {
            service,
            max_retries: config.max_retries,
            request_timeout_secs: config.request_timeout_secs,
        }
    }

    /// 从一个纯文本题目块提取一条结构化题目
    pub async fn extract_question_text(
        &self,
        ctx: &BlockCtx,
        block_text: &str,
    ) -> AppResult<ExtractedQuestion> {
        info!("{} 题干: {}", ctx, truncate_text(block_text, 80));

        let request = CompletionRequest::text(prompts::question_text_prompt(block_text));
        let value = self.complete_and_parse(&request, JsonShape::Object).await?;

        Ok(normalize_question(value)?)
    }

    /// 从单题截图提取一条结构化题目（视觉）
    pub async fn extract_question_image(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> AppResult<ExtractedQuestion> {
        info!("🖼️ 单题截图提取 ({} 字节)", bytes.len());

        let request = CompletionRequest::vision(prompts::single_image_prompt(), bytes, mime_type);
        let value = self.complete_and_parse(&request, JsonShape::Object).await?;

        Ok(normalize_question(value)?)
    }

    /// 从整页多题图片提取题目列表（视觉）
    pub async fn extract_questions_image(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> AppResult<Vec<ExtractedQuestion>> {
        info!("🖼️ 多题整页提取 ({} 字节)", bytes.len());

        let request =
            CompletionRequest::vision(prompts::multi_question_image_prompt(), bytes, mime_type);
        let value = self.complete_and_parse(&request, JsonShape::Array).await?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(ExtractError::MalformedRoot {
                    found: value_kind_name(&other),
                }
                .into())
            }
        };

        // 单条坏数据跳过并警告，不拖垮整页
        let mut questions = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match normalize_question(item) {
                Ok(q) => questions.push(q),
                Err(e) => warn!("整页第 {} 条无法规范化，已跳过: {}", i, e),
            }
        }

        info!("✓ 整页提取完成，共 {} 道题", questions.len());
        Ok(questions)
    }

    /// 从答案键表格图片提取答案键列表（视觉）
    pub async fn extract_answer_key_image(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> AppResult<Vec<AnswerKeyEntry>> {
        info!("🗝️ 答案键提取 ({} 字节)", bytes.len());

        let request =
            CompletionRequest::vision(prompts::answer_key_image_prompt(), bytes, mime_type);
        let value = self.complete_and_parse(&request, JsonShape::Array).await?;

        let entries = normalize_answer_key(value)?;
        info!("✓ 答案键提取完成，共 {} 条", entries.len());
        Ok(entries)
    }

    /// 调模型并按期望形状解析，失败在上限内原样重发
    async fn complete_and_parse(
        &self,
        request: &CompletionRequest,
        shape: JsonShape,
    ) -> AppResult<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = match self.complete_with_timeout(request.clone()).await {
                Ok(raw) => {
                    debug!("模型原始输出: {}", truncate_text(&raw, 200));
                    parse_relaxed(&raw, shape).map_err(AppError::from)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt <= self.max_retries && e.is_retryable() => {
                    warn!("第 {} 次尝试失败，原样重发: {}", attempt, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 单次调用套超时，把悬死的请求变成可记录的失败
    async fn complete_with_timeout(&self, request: CompletionRequest) -> AppResult<String> {
        let limit = Duration::from_secs(self.request_timeout_secs);
        match tokio::time::timeout(limit, self.service.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Llm(LlmError::Timeout {
                secs: self.request_timeout_secs,
            })),
        }
    }
}

fn value_kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
