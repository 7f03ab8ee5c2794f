//! 文档处理服务 - 业务能力层
//!
//! 只负责"PDF 变文本、文本变题目块"能力，不关心流程。
//! 切分只是一个题头正则，核心难点都在下游的恢复/规范化里。

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{AppError, AppResult, FileError};
use crate::models::batch::RawQuestionBlock;

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Q\.\s*\d+").expect("题头正则应当合法"))
}

/// 从 PDF 字节里提取纯文本
pub fn extract_pdf_text(bytes: &[u8]) -> AppResult<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        AppError::File(FileError::PdfParseFailed {
            source: Box::new(e),
        })
    })
}

/// 按 "Q.<序号>" 题头把整篇文本切成题目块
///
/// 每个块去掉题头前缀；空块跳过。`source_index` 按出现顺序递增，
/// 供批次聚合时排序，与题头里的数字无关。
pub fn split_question_blocks(text: &str) -> Vec<RawQuestionBlock> {
    let headers: Vec<_> = header_regex().find_iter(text).collect();

    let mut blocks = Vec::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        let end = headers
            .get(i + 1)
            .map(|next| next.start())
            .unwrap_or(text.len());

        let body = text[header.end()..end].trim();
        if body.is_empty() {
            debug!("跳过空题目块 (题头: {})", header.as_str());
            continue;
        }

        blocks.push(RawQuestionBlock::new(blocks.len(), body));
    }

    blocks
}
