use serde::{Deserialize, Serialize};

use crate::models::question::ExtractedQuestion;

/// 原始题目块
///
/// 由文档切分产生、消费一次即丢弃的临时数据。
/// `source_index` 记录它在原文档中的位置，用于最终排序。
#[derive(Debug, Clone)]
pub struct RawQuestionBlock {
    pub source_index: usize,
    pub text: String,
}

impl RawQuestionBlock {
    pub fn new(source_index: usize, text: impl Into<String>) -> Self {
        Self {
            source_index,
            text: text.into(),
        }
    }
}

/// 单个题目块的失败记录
///
/// 失败是契约的一部分，随响应一起返回，而不是只打一行日志就丢掉。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    /// 对应 RawQuestionBlock 的 source_index
    pub index: usize,
    pub reason: String,
}

/// 批次提取结果
///
/// 成功与失败并列返回；全部失败的批次也是一个合法结果
/// （results 为空、failures 非空），由调用方决定如何呈现。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub results: Vec<ExtractedQuestion>,
    pub failures: Vec<ExtractionFailure>,
}

impl BatchOutcome {
    /// 批次是否一条都没成功
    pub fn is_total_failure(&self) -> bool {
        self.results.is_empty() && !self.failures.is_empty()
    }
}

/// 全局处理统计
#[derive(Debug, Default)]
pub struct BatchStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_failure() {
        let mut outcome = BatchOutcome::default();
        assert!(!outcome.is_total_failure());

        outcome.failures.push(ExtractionFailure {
            index: 0,
            reason: "boom".to_string(),
        });
        assert!(outcome.is_total_failure());

        outcome.results.push(ExtractedQuestion::default());
        assert!(!outcome.is_total_failure());
    }
}
