//! 提示词模板 - 业务能力层
//!
//! 四个提取调用点（纯文本题目、单题截图、多题整页、答案键表格）
//! 各自一份模板，集中放在这里，调用点不再各写各的。
//!
//! 所有模板都要求模型只输出 JSON；但模型经常不守规矩，
//! 下游必须走 `json_recover` 的宽松解析，不能直接 `from_str`。

/// 纯文本题目提取提示词
pub fn question_text_prompt(raw_question: &str) -> String {
    format!(
        r#"You are given a raw exam question. Extract structured details in JSON:

{{
  "questionText": "...",
  "options": [{{ "text": "...", "isCorrect": true/false }}],
  "difficulty": "easy|medium|hard",
  "tags": ["..."],
  "year": "unknown or actual year",
  "source": "PYQ|Mock|Unknown",
  "answerKey": "correct option text",
  "solution": {{ "steps": ["..."], "explanation": "step by step explanation with formulas where needed" }},
  "hint": "short guiding tip"
}}

Return ONLY valid JSON, no extra text.
Question:
{raw_question}"#
    )
}

/// 单题截图提取提示词（视觉）
pub fn single_image_prompt() -> &'static str {
    r#"You are given a screenshot of a competitive exam question.
Extract the details in strict JSON format.

Fields:
- questionText: string
- options: array of { text: string, isCorrect: boolean }
- difficulty: "easy" | "medium" | "hard"
- tags: array of strings
- year: string or "unknown"
- source: "PYQ" | "Mock" | "Unknown"
- answerKey: string (correct option text)
- solution: { steps: array of strings, explanation: string }
- hint: string (short guiding tip)

Return ONLY valid JSON, no markdown, no extra text."#
}

/// 多题整页提取提示词（视觉，支持双栏排版和填空题）
pub fn multi_question_image_prompt() -> &'static str {
    r#"You are given an image of multiple exam questions from a book.
The page may be in TWO COLUMNS, so some questions may start in one column and their options continue in the second column.
Reconstruct the full question + options properly.

Return ONLY a valid JSON array like:

[
  {
    "questionNumber": 48,
    "questionText": "What is the minimum number of page colours ...",
    "options": ["A) 2", "B) 4", "C) 8", "D) 16"]
  },
  {
    "questionNumber": 55,
    "questionText": "A computer system implements a 40-bit virtual address ... The minimum length of the TLB tag in bits is ____.",
    "options": []
  }
]

Rules:
- Merge both columns into a single sequence (question then options).
- If a question is incomplete in column 1, continue it from column 2 before moving to the next question.
- For fill-in-the-blank or numeric questions with no A/B/C/D options, set "options": [] and include "____" in the questionText.
- Never skip a question. Preserve the questionNumber."#
}

/// 答案键表格提取提示词（视觉，支持 MCQ / MSQ / 数值）
pub fn answer_key_image_prompt() -> &'static str {
    r#"You are given an image of an answer key table.
Return ONLY a valid JSON array like:

[
  { "questionNumber": 49, "correctOption": "C" },
  { "questionNumber": 50, "correctOption": "B" },
  { "questionNumber": 55, "correctOption": "122" },
  { "questionNumber": 73, "correctOption": "B,C,D" }
]

Rules:
- For single correct MCQ return "A", "B", "C", or "D".
- For multiple correct (MSQ) join letters with commas (e.g., "A,C,D").
- For numeric answers return the number or string exactly as shown (e.g., "154.5", "4096").
- No explanations or extra text.
- Output ONLY JSON array."#
}
