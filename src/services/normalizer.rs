//! 结构校验 / 规范化服务 - 业务能力层
//!
//! 模型响应在边界上是无类型的 `serde_json::Value`，必须立刻经过本模块
//! 变成静态类型记录，无类型数据绝不流向下游。
//!
//! 规则：字段存在且类型正确则透传；类型不对则尽力转成字符串；
//! 缺失则补默认值。字段缺失永远不是错误，只有根节点不是对象/数组
//! 时才返回 `MalformedRoot`。

use serde_json::Value;
use tracing::warn;

use crate::error::ExtractError;
use crate::models::question::{
    AnswerKeyEntry, Difficulty, ExtractedQuestion, QuestionOption, QuestionSource, Solution,
};

/// 把恢复出来的 JSON 值规范化为一条完整的题目记录
///
/// 如果根是数组则取第一个元素并丢弃其余（模型偶尔会把单个答案包进
/// 数组里）——这是显式策略而非沉默容忍，触发时会记录警告。
pub fn normalize_question(parsed: Value) -> Result<ExtractedQuestion, ExtractError> {
    let obj = unwrap_root(parsed)?;

    let question_number = obj.get("questionNumber").and_then(coerce_i64);

    let question_text = obj
        .get("questionText")
        .and_then(coerce_string)
        .unwrap_or_default();
    if question_text.is_empty() {
        warn!("规范化警告: questionText 为空，仍按完整记录输出");
    }

    let options = match obj.get("options") {
        Some(Value::Array(items)) => items.iter().filter_map(coerce_option).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!("规范化警告: options 不是数组，按单个选项处理");
            coerce_option(other).into_iter().collect()
        }
    };

    let difficulty = obj
        .get("difficulty")
        .and_then(coerce_string)
        .map(|s| Difficulty::find(&s))
        .unwrap_or_default();

    let tags = match obj.get("tags") {
        Some(Value::Array(items)) => items.iter().filter_map(coerce_string).collect(),
        Some(Value::String(s)) if !s.is_empty() => std::iter::once(s.clone()).collect(),
        _ => Default::default(),
    };

    let year = obj
        .get("year")
        .and_then(coerce_string)
        .unwrap_or_else(|| "unknown".to_string());

    let source = obj
        .get("source")
        .and_then(coerce_string)
        .map(|s| QuestionSource::find(&s))
        .unwrap_or_default();

    let answer_key = obj.get("answerKey").and_then(coerce_string);

    let solution = obj.get("solution").map(coerce_solution).unwrap_or_default();

    let hint = obj.get("hint").and_then(coerce_string).unwrap_or_default();

    Ok(ExtractedQuestion {
        question_number,
        question_text,
        options,
        difficulty,
        tags,
        year,
        source,
        answer_key,
        solution,
        hint,
    })
}

/// 把恢复出来的 JSON 值规范化为答案键条目列表
///
/// 条目级的缺失/坏数据跳过并警告；只有根形状完全不对才报错。
pub fn normalize_answer_key(parsed: Value) -> Result<Vec<AnswerKeyEntry>, ExtractError> {
    let items = match parsed {
        Value::Array(items) => items,
        // 单条答案未包数组时也接受
        obj @ Value::Object(_) => vec![obj],
        other => {
            return Err(ExtractError::MalformedRoot {
                found: value_kind(&other),
            })
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let number = item.get("questionNumber").and_then(coerce_i64);
        let option = item.get("correctOption").and_then(coerce_string);
        match (number, option) {
            (Some(question_number), Some(correct_option)) => entries.push(AnswerKeyEntry {
                question_number,
                correct_option,
            }),
            _ => warn!("规范化警告: 答案键第 {} 条缺少题号或选项，已跳过", i),
        }
    }

    Ok(entries)
}

/// 数组取第一个元素、对象直接用，其余形状一律 MalformedRoot
fn unwrap_root(parsed: Value) -> Result<serde_json::Map<String, Value>, ExtractError> {
    match parsed {
        Value::Object(map) => Ok(map),
        Value::Array(items) => {
            let len = items.len();
            let first = items.into_iter().next().ok_or(ExtractError::MalformedRoot {
                found: "empty array",
            })?;
            if len > 1 {
                warn!("规范化警告: 模型把单个对象包进了数组 (共 {} 个)，只取第一个", len);
            }
            match first {
                Value::Object(map) => Ok(map),
                other => Err(ExtractError::MalformedRoot {
                    found: value_kind(&other),
                }),
            }
        }
        other => Err(ExtractError::MalformedRoot {
            found: value_kind(&other),
        }),
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 尽力转字符串：字符串透传，数字/布尔转写，复合值转紧凑 JSON
fn coerce_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => serde_json::to_string(other).ok(),
    }
}

fn coerce_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 选项既可能是 `{text, isCorrect}` 对象，也可能是裸字符串
fn coerce_option(v: &Value) -> Option<QuestionOption> {
    match v {
        Value::Object(map) => {
            let text = map.get("text").and_then(coerce_string).unwrap_or_default();
            let is_correct = map.get("isCorrect").and_then(Value::as_bool);
            Some(QuestionOption { text, is_correct })
        }
        Value::Null => None,
        other => coerce_string(other).map(QuestionOption::unmarked),
    }
}

/// solution 既可能是规范的 `{steps, explanation}`，也可能是整段字符串
fn coerce_solution(v: &Value) -> Solution {
    match v {
        Value::Object(map) => Solution {
            steps: match map.get("steps") {
                Some(Value::Array(items)) => items.iter().filter_map(coerce_string).collect(),
                _ => Vec::new(),
            },
            explanation: map
                .get("explanation")
                .and_then(coerce_string)
                .unwrap_or_default(),
        },
        Value::Array(items) => Solution {
            steps: items.iter().filter_map(coerce_string).collect(),
            explanation: String::new(),
        },
        other => Solution {
            steps: Vec::new(),
            explanation: coerce_string(other).unwrap_or_default(),
        },
    }
}
