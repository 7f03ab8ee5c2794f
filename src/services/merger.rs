//! 题目 / 答案键合并服务 - 业务能力层
//!
//! 把分开提取的题目列表和答案键列表按题号对上，支持 MCQ、MSQ 和
//! 数值题三种匹配规则。输出严格保持输入题目的顺序和数量。

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::models::question::{AnswerKeyEntry, ExtractedQuestion, MergedQuestion};

/// 合并题目与答案键
///
/// - 题号在键里不存在 → `correct_option = None`，不标注任何选项（未解决，不是错误）
/// - MCQ/MSQ → 按选项首字母标注命中的选项
/// - 数值键（接受集含非字母 token）→ 附上 `correct_option` 但选项列表原样返回
/// - 键里多出来的题号静默不用（键映射只是查询辅助，不作迭代来源）
pub fn merge_questions_and_keys(
    questions: Vec<ExtractedQuestion>,
    keys: &[AnswerKeyEntry],
) -> Vec<MergedQuestion> {
    // O(n) 建表，O(1) 查询；题号重复按后写覆盖并警告
    let mut key_map: HashMap<i64, &str> = HashMap::with_capacity(keys.len());
    for entry in keys {
        if key_map
            .insert(entry.question_number, entry.correct_option.as_str())
            .is_some()
        {
            warn!(
                "答案键题号 {} 出现多次，按最后一条为准",
                entry.question_number
            );
        }
    }

    questions
        .into_iter()
        .map(|mut question| {
            let correct_option = question
                .question_number
                .and_then(|n| key_map.get(&n))
                .map(|s| s.to_string());

            if let Some(correct) = &correct_option {
                mark_options(&mut question, correct);
            }

            MergedQuestion {
                question,
                correct_option,
            }
        })
        .collect()
}

/// 按接受的字母集标注选项
fn mark_options(question: &mut ExtractedQuestion, correct: &str) {
    if question.options.is_empty() {
        return;
    }

    let accepted: HashSet<String> = correct
        .split(',')
        .map(|token| token.trim().to_uppercase())
        .filter(|token| !token.is_empty())
        .collect();

    // 数值题：接受集里有非字母 token，没有可比对的选项字母
    let is_numeric = accepted
        .iter()
        .any(|token| token.chars().any(|c| !c.is_ascii_alphabetic()));
    if is_numeric {
        debug!(
            "题号 {:?} 为数值答案 ({}), 跳过选项标注",
            question.question_number, correct
        );
        return;
    }

    for option in &mut question.options {
        if let Some(letter) = option.leading_letter() {
            if accepted.contains(&letter.to_string()) {
                option.is_correct = Some(true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionOption;

    fn question(number: i64, options: &[&str]) -> ExtractedQuestion {
        ExtractedQuestion {
            question_number: Some(number),
            question_text: format!("question {}", number),
            options: options
                .iter()
                .map(|text| QuestionOption::unmarked(*text))
                .collect(),
            ..Default::default()
        }
    }

    fn key(number: i64, option: &str) -> AnswerKeyEntry {
        AnswerKeyEntry {
            question_number: number,
            correct_option: option.to_string(),
        }
    }

    #[test]
    fn test_mcq_single_letter() {
        let questions = vec![question(49, &["A) 1", "B) 2", "C) 3", "D) 4"])];
        let keys = vec![key(49, "C")];

        let merged = merge_questions_and_keys(questions, &keys);
        assert_eq!(merged[0].correct_option.as_deref(), Some("C"));

        let opts = &merged[0].question.options;
        assert_eq!(opts[0].is_correct, None);
        assert_eq!(opts[1].is_correct, None);
        assert_eq!(opts[2].is_correct, Some(true));
        assert_eq!(opts[3].is_correct, None);
        // 标注不改动选项文本
        assert_eq!(opts[2].text, "C) 3");
    }

    #[test]
    fn test_msq_multiple_letters() {
        let questions = vec![question(73, &["A) x", "B) y", "C) z", "D) w"])];
        let keys = vec![key(73, "B,C,D")];

        let merged = merge_questions_and_keys(questions, &keys);
        let opts = &merged[0].question.options;
        assert_eq!(opts[0].is_correct, None);
        assert_eq!(opts[1].is_correct, Some(true));
        assert_eq!(opts[2].is_correct, Some(true));
        assert_eq!(opts[3].is_correct, Some(true));
    }

    #[test]
    fn test_numeric_key_keeps_options_unchanged() {
        let questions = vec![question(55, &[])];
        let keys = vec![key(55, "122")];

        let merged = merge_questions_and_keys(questions, &keys);
        assert_eq!(merged[0].correct_option.as_deref(), Some("122"));
        assert!(merged[0].question.options.is_empty());
    }

    #[test]
    fn test_numeric_key_with_options_skips_marking() {
        let questions = vec![question(56, &["A) 100", "B) 122"])];
        let keys = vec![key(56, "154.5")];

        let merged = merge_questions_and_keys(questions, &keys);
        assert_eq!(merged[0].correct_option.as_deref(), Some("154.5"));
        assert!(merged[0]
            .question
            .options
            .iter()
            .all(|o| o.is_correct.is_none()));
    }

    #[test]
    fn test_missing_key_is_not_an_error() {
        let questions = vec![question(1, &["A) a", "B) b"])];
        let merged = merge_questions_and_keys(questions, &[]);

        assert_eq!(merged[0].correct_option, None);
        assert!(merged[0]
            .question
            .options
            .iter()
            .all(|o| o.is_correct.is_none()));
    }

    #[test]
    fn test_extra_keys_are_silently_unused() {
        let questions = vec![question(1, &["A) a"])];
        let keys = vec![key(1, "A"), key(99, "D")];

        let merged = merge_questions_and_keys(questions, &keys);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].question.options[0].is_correct, Some(true));
    }

    #[test]
    fn test_merge_preserves_length_and_order() {
        let questions = vec![
            question(3, &["A) a"]),
            question(1, &["A) a"]),
            question(2, &["A) a"]),
        ];
        let keys = vec![key(1, "A"), key(2, "A"), key(3, "A")];

        let merged = merge_questions_and_keys(questions, &keys);
        let numbers: Vec<_> = merged
            .iter()
            .map(|m| m.question.question_number)
            .collect();
        assert_eq!(numbers, vec![Some(3), Some(1), Some(2)]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let questions = vec![question(7, &["A) a", "B) b"])];
        let keys = vec![key(7, "A"), key(7, "B")];

        let merged = merge_questions_and_keys(questions, &keys);
        assert_eq!(merged[0].correct_option.as_deref(), Some("B"));
        assert_eq!(merged[0].question.options[0].is_correct, None);
        assert_eq!(merged[0].question.options[1].is_correct, Some(true));
    }

    #[test]
    fn test_question_without_number_stays_unresolved() {
        let mut q = question(0, &["A) a"]);
        q.question_number = None;
        let keys = vec![key(0, "A")];

        let merged = merge_questions_and_keys(vec![q], &keys);
        assert_eq!(merged[0].correct_option, None);
    }
}
