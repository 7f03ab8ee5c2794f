//! 题目块处理上下文
//!
//! 封装"我正在处理哪次上传的第几个块"这一信息，仅用于日志显示

use std::fmt::Display;

/// 题目块处理上下文
#[derive(Debug, Clone)]
pub struct BlockCtx {
    /// 上传标识
    pub upload_id: String,

    /// 块在原文档中的位置
    pub source_index: usize,
}

impl BlockCtx {
    /// 创建新的块上下文
    pub fn new(upload_id: impl Into<String>, source_index: usize) -> Self {
        Self {
            upload_id: upload_id.into(),
            source_index,
        }
    }
}

impl Display for BlockCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[上传 {} 块 {}]", self.upload_id, self.source_index)
    }
}
