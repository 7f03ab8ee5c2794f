use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 难度枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 简单
    Easy,
    /// 中等
    Medium,
    /// 困难
    Hard,
    /// 未知（模型未给出或无法识别）
    Unknown,
}

impl Difficulty {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unknown => "unknown",
        }
    }

    /// 智能查找难度（支持模糊匹配，识别失败回落到 Unknown）
    pub fn find(s: &str) -> Self {
        let s_lower = s.trim().to_lowercase();
        match s_lower.as_str() {
            "easy" => return Difficulty::Easy,
            "medium" => return Difficulty::Medium,
            "hard" => return Difficulty::Hard,
            _ => {}
        }

        if s_lower.contains("easy") {
            return Difficulty::Easy;
        }
        if s_lower.contains("medium") || s_lower.contains("moderate") {
            return Difficulty::Medium;
        }
        if s_lower.contains("hard") || s_lower.contains("difficult") {
            return Difficulty::Hard;
        }

        Difficulty::Unknown
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Unknown
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题目来源枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionSource {
    /// 往年真题
    #[serde(rename = "PYQ")]
    Pyq,
    /// 模拟题
    Mock,
    /// 未知
    Unknown,
}

impl QuestionSource {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            QuestionSource::Pyq => "PYQ",
            QuestionSource::Mock => "Mock",
            QuestionSource::Unknown => "Unknown",
        }
    }

    /// 智能查找来源（支持模糊匹配）
    pub fn find(s: &str) -> Self {
        let s_lower = s.trim().to_lowercase();
        if s_lower == "pyq" || s_lower.contains("previous") {
            return QuestionSource::Pyq;
        }
        if s_lower.contains("mock") {
            return QuestionSource::Mock;
        }
        QuestionSource::Unknown
    }
}

impl Default for QuestionSource {
    fn default() -> Self {
        QuestionSource::Unknown
    }
}

impl std::fmt::Display for QuestionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 单个选项
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    /// 选项文本（例如 "A) 2"）
    pub text: String,
    /// 是否为正确选项，None 表示尚未确定
    #[serde(default)]
    pub is_correct: Option<bool>,
}

impl QuestionOption {
    /// 从裸文本创建一个未标注的选项
    pub fn unmarked(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_correct: None,
        }
    }

    /// 选项的首字母标记（"A) 2" → 'A'），用于和答案键比对
    pub fn leading_letter(&self) -> Option<char> {
        self.text
            .trim()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
    }
}

/// 解答（分步步骤 + 总说明）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Solution {
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

/// 规范化后的结构化题目记录
///
/// 不变式：每个字段都有默认值。只要模型返回的是语法合法的对象，
/// 哪怕语义上是空的，也能得到一条完整的记录——任何字段都不会缺失。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedQuestion {
    /// 题号（多题图片提取时存在，单题流程为 None）
    #[serde(default)]
    pub question_number: Option<i64>,
    #[serde(default)]
    pub question_text: String,
    /// 选项序列，数值题允许为空
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// 年份，允许 "unknown" 哨兵值
    #[serde(default = "default_year")]
    pub year: String,
    #[serde(default)]
    pub source: QuestionSource,
    #[serde(default)]
    pub answer_key: Option<String>,
    #[serde(default)]
    pub solution: Solution,
    #[serde(default)]
    pub hint: String,
}

fn default_year() -> String {
    "unknown".to_string()
}

impl Default for ExtractedQuestion {
    fn default() -> Self {
        Self {
            question_number: None,
            question_text: String::new(),
            options: Vec::new(),
            difficulty: Difficulty::Unknown,
            tags: BTreeSet::new(),
            year: default_year(),
            source: QuestionSource::Unknown,
            answer_key: None,
            solution: Solution::default(),
            hint: String::new(),
        }
    }
}

/// 答案键条目
///
/// `correct_option` 可能是单字母（MCQ）、逗号连接的字母集（MSQ）
/// 或数值字符串（填空/数值题）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKeyEntry {
    pub question_number: i64,
    pub correct_option: String,
}

/// 合并答案键之后的题目记录
///
/// 派生数据，仅在单次合并调用内存活，不单独持久化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedQuestion {
    #[serde(flatten)]
    pub question: ExtractedQuestion,
    /// 答案键中解析到的正确选项；题号在键里不存在时为 None（不是错误）
    pub correct_option: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_find() {
        assert_eq!(Difficulty::find("easy"), Difficulty::Easy);
        assert_eq!(Difficulty::find(" Medium "), Difficulty::Medium);
        assert_eq!(Difficulty::find("HARD"), Difficulty::Hard);
        assert_eq!(Difficulty::find("very difficult"), Difficulty::Hard);
        assert_eq!(Difficulty::find("不知道"), Difficulty::Unknown);
        assert_eq!(Difficulty::find(""), Difficulty::Unknown);
    }

    #[test]
    fn test_source_find() {
        assert_eq!(QuestionSource::find("PYQ"), QuestionSource::Pyq);
        assert_eq!(
            QuestionSource::find("previous year question"),
            QuestionSource::Pyq
        );
        assert_eq!(QuestionSource::find("Mock"), QuestionSource::Mock);
        assert_eq!(QuestionSource::find("whatever"), QuestionSource::Unknown);
    }

    #[test]
    fn test_option_leading_letter() {
        assert_eq!(QuestionOption::unmarked("A) 2").leading_letter(), Some('A'));
        assert_eq!(
            QuestionOption::unmarked("  c) 答案").leading_letter(),
            Some('C')
        );
        assert_eq!(QuestionOption::unmarked("").leading_letter(), None);
    }

    #[test]
    fn test_default_question_is_well_formed() {
        let q = ExtractedQuestion::default();
        assert_eq!(q.year, "unknown");
        assert_eq!(q.difficulty, Difficulty::Unknown);
        assert_eq!(q.source, QuestionSource::Unknown);
        assert!(q.options.is_empty());
        assert!(q.answer_key.is_none());
    }

    #[test]
    fn test_serde_round_trip_uses_camel_case() {
        let q = ExtractedQuestion {
            question_number: Some(49),
            question_text: "1+1=?".to_string(),
            answer_key: Some("B".to_string()),
            ..Default::default()
        };
        let v = serde_json::to_value(&q).unwrap();
        assert_eq!(v["questionNumber"], 49);
        assert_eq!(v["questionText"], "1+1=?");
        assert_eq!(v["answerKey"], "B");
        assert_eq!(v["difficulty"], "unknown");
        assert_eq!(v["source"], "Unknown");
    }
}
