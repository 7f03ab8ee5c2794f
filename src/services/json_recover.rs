//! JSON 恢复服务 - 业务能力层
//!
//! 只负责"从不可靠的模型输出里抢救出 JSON"能力，不关心流程。
//! 所有提取调用点（文本、视觉、多题）共用这一份实现，不再各自用正则修补。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::ExtractError;

/// 期望恢复的 JSON 根形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// 单个对象 `{...}`
    Object,
    /// 数组 `[...]`
    Array,
}

impl JsonShape {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonShape::Object => "object",
            JsonShape::Array => "array",
        }
    }

    fn open(self) -> char {
        match self {
            JsonShape::Object => '{',
            JsonShape::Array => '[',
        }
    }

    fn close(self) -> char {
        match self {
            JsonShape::Object => '}',
            JsonShape::Array => ']',
        }
    }
}

impl std::fmt::Display for JsonShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```(?:json)?").expect("代码围栏正则应当合法"))
}

/// 去除模型输出中的格式噪音
///
/// 删除带或不带语言标签的代码围栏，并去掉首尾空白。
/// 纯函数，永不失败；空输入返回空字符串。
pub fn normalize_model_text(raw: &str) -> String {
    fence_regex().replace_all(raw, "").trim().to_string()
}

/// 从任意文本中恢复第一个配平的 JSON 值
///
/// 从第一个起始符开始逐字符扫描，增量维护嵌套深度；
/// 用"是否在字符串字面量内"标志 + 反斜杠回看保证字符串内容里的
/// 括号（例如 `{"text": "a } b"}`）不会污染深度计数。
/// 深度归零处即为匹配的结束符，返回含首尾分隔符的切片。
pub fn recover_json(text: &str, shape: JsonShape) -> Result<&str, ExtractError> {
    let open = shape.open();
    let close = shape.close();

    let start = text
        .find(open)
        .ok_or(ExtractError::JsonNotFound {
            shape: shape.as_str(),
        })?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Ok(&text[start..start + i + ch.len_utf8()]);
            }
        }
    }

    Err(ExtractError::UnbalancedJson {
        shape: shape.as_str(),
        open_at: start,
    })
}

/// 去掉收尾逗号（`,}` → `}`，`,]` → `]`）
///
/// 模型即便嵌套配平也经常多写一个收尾逗号。字符串字面量内的
/// 逗号原样保留。
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }

        if ch == '"' {
            in_string = true;
            out.push(ch);
            continue;
        }

        if ch == ',' {
            // 向后看第一个非空白字符，紧跟收尾符则丢弃这个逗号
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }

        out.push(ch);
    }

    out
}

/// 宽松解析：归一化 → 直接解析 → 恢复切片 → 去收尾逗号再解析
///
/// 这是所有调用点的统一入口，失败时返回本块不可恢复的错误。
pub fn parse_relaxed(raw: &str, shape: JsonShape) -> Result<Value, ExtractError> {
    let cleaned = normalize_model_text(raw);

    // 最理想的情况：整段就是合法 JSON
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        if root_matches(&value, shape) {
            return Ok(value);
        }
    }

    let slice = recover_json(&cleaned, shape)?;

    match serde_json::from_str::<Value>(slice) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            debug!("首次解析失败，尝试去收尾逗号: {}", first_err);
            let repaired = strip_trailing_commas(slice);
            serde_json::from_str::<Value>(&repaired).map_err(|e| ExtractError::ParseFailed {
                source: Box::new(e),
            })
        }
    }
}

fn root_matches(value: &Value, shape: JsonShape) -> bool {
    match shape {
        JsonShape::Object => value.is_object(),
        JsonShape::Array => value.is_array(),
    }
}
