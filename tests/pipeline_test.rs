//! 端到端流水线测试
//!
//! 用脚本化的假补全服务替代真实模型，离线验证批量提取的
//! 失败隔离、重试上界、结果排序、并发上限与多题合并流程。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use question_extract::clients::{CompletionRequest, CompletionService};
use question_extract::error::AppResult;
use question_extract::models::batch::RawQuestionBlock;
use question_extract::orchestrator::{App, BatchExtractor};
use question_extract::{AppError, Config};

/// 脚本化补全服务
///
/// 每条提示词各自计数尝试次数，响应和延迟由闭包决定，
/// 让测试可以精确模拟"第一次坏、第二次好"之类的模型行为。
/// 同时记录同时在途的调用数，供并发上限测试读取。
struct ScriptedService<F> {
    attempts: Mutex<HashMap<String, usize>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    respond: F,
}

impl<F> ScriptedService<F>
where
    F: Fn(&CompletionRequest, usize) -> (Duration, AppResult<String>) + Send + Sync,
{
    fn new(respond: F) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            respond,
        }
    }

    /// 并发峰值计数器（在服务被移交给提取器之前克隆出来）
    fn max_in_flight_gauge(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_in_flight)
    }
}

impl<F> CompletionService for ScriptedService<F>
where
    F: Fn(&CompletionRequest, usize) -> (Duration, AppResult<String>) + Send + Sync,
{
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(request.prompt.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (delay, result) = (self.respond)(&request, attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn test_config() -> Config {
    Config {
        max_concurrent_requests: 8,
        max_retries: 1,
        request_timeout_secs: 5,
        ..Config::default()
    }
}

/// 构造一条合法的题目 JSON 响应
fn question_json(number: i64, text: &str) -> String {
    format!(
        r#"{{"questionNumber": {number}, "questionText": "{text}", "options": [], "difficulty": "easy", "year": "unknown", "source": "Mock"}}"#
    )
}

fn blocks(n: usize) -> Vec<RawQuestionBlock> {
    (0..n)
        .map(|i| RawQuestionBlock::new(i, format!("block-{i} body")))
        .collect()
}

#[tokio::test]
async fn test_failing_block_is_isolated_from_siblings() {
    // 块 3 每次都失败，其余 4 块正常
    let service = ScriptedService::new(|request: &CompletionRequest, _attempt| {
        if request.prompt.contains("block-3 body") {
            return (
                Duration::ZERO,
                Err(AppError::Other("模拟的上游故障".to_string())),
            );
        }
        for i in 0..5usize {
            if request.prompt.contains(&format!("block-{i} body")) {
                return (
                    Duration::ZERO,
                    Ok(question_json(i as i64, &format!("question {i}"))),
                );
            }
        }
        unreachable!("未知提示词");
    });

    let extractor = BatchExtractor::new(service, &test_config());
    let outcome = extractor.extract_batch("upload-1", &blocks(5)).await;

    assert_eq!(outcome.results.len(), 4);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 3);
    assert!(!outcome.is_total_failure());

    // 成功结果不含失败块的题
    let numbers: Vec<_> = outcome
        .results
        .iter()
        .map(|q| q.question_number.unwrap())
        .collect();
    assert_eq!(numbers, vec![0, 1, 2, 4]);
}

#[tokio::test]
async fn test_malformed_first_attempt_retried_once_then_succeeds() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in = Arc::clone(&calls);

    let service = ScriptedService::new(move |_request: &CompletionRequest, attempt| {
        calls_in.fetch_add(1, Ordering::SeqCst);
        if attempt == 1 {
            // 第一次返回完全没有 JSON 的闲聊
            (
                Duration::ZERO,
                Ok("I could not find a question.".to_string()),
            )
        } else {
            (
                Duration::ZERO,
                Ok(format!(
                    "Sure! Here's the JSON:\n```json\n{}\n```",
                    question_json(7, "retried")
                )),
            )
        }
    });

    let extractor = BatchExtractor::new(service, &test_config());
    let outcome = extractor.extract_batch("upload-2", &blocks(1)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].question_text, "retried");
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_persistent_failure_stops_after_retry_budget() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in = Arc::clone(&calls);

    // 永远返回解析不出来的垃圾，可重试错误只允许追加一次
    let service = ScriptedService::new(move |_request: &CompletionRequest, _attempt| {
        calls_in.fetch_add(1, Ordering::SeqCst);
        (Duration::ZERO, Ok("no json anywhere".to_string()))
    });

    let extractor = BatchExtractor::new(service, &test_config());
    let outcome = extractor.extract_batch("upload-3", &blocks(1)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2, "首次 + 一次重试");
    assert!(outcome.is_total_failure());
    assert_eq!(outcome.failures[0].index, 0);
}

#[tokio::test]
async fn test_results_ordered_by_source_index_not_completion_order() {
    // 块 0 最慢、块 3 最快，完成顺序与派发顺序相反
    let service = ScriptedService::new(|request: &CompletionRequest, _attempt| {
        for i in 0..4usize {
            if request.prompt.contains(&format!("block-{i} body")) {
                let delay = Duration::from_millis((4 - i as u64) * 20);
                return (delay, Ok(question_json(i as i64, &format!("q{i}"))));
            }
        }
        unreachable!("未知提示词");
    });

    let extractor = BatchExtractor::new(service, &test_config());
    let outcome = extractor.extract_batch("upload-4", &blocks(4)).await;

    let numbers: Vec<_> = outcome
        .results
        .iter()
        .map(|q| q.question_number.unwrap())
        .collect();
    assert_eq!(numbers, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_configured_limit() {
    let service = ScriptedService::new(|_request: &CompletionRequest, _attempt| {
        (
            Duration::from_millis(30),
            Ok(question_json(0, "concurrent")),
        )
    });
    let max_seen = service.max_in_flight_gauge();

    let config = Config {
        max_concurrent_requests: 2,
        ..test_config()
    };
    let extractor = BatchExtractor::new(service, &config);
    let outcome = extractor.extract_batch("upload-5", &blocks(6)).await;

    assert_eq!(outcome.results.len(), 6);
    assert!(
        max_seen.load(Ordering::SeqCst) <= 2,
        "同时在途请求数 {} 超过上限 2",
        max_seen.load(Ordering::SeqCst)
    );
}

/// 多题整页 + 答案键两张图的脚本化响应（按提示词区分两类视觉请求）
fn multi_q_service(
) -> ScriptedService<impl Fn(&CompletionRequest, usize) -> (Duration, AppResult<String>) + Send + Sync>
{
    ScriptedService::new(|request: &CompletionRequest, _attempt| {
        assert!(request.image.is_some(), "多题流程应该走视觉请求");
        if request.prompt.contains("answer key table") {
            (
                Duration::ZERO,
                Ok(r#"[
                    { "questionNumber": 49, "correctOption": "C" },
                    { "questionNumber": 50, "correctOption": "B,D" },
                    { "questionNumber": 55, "correctOption": "122" }
                ]"#
                .to_string()),
            )
        } else {
            (
                Duration::ZERO,
                Ok(r#"```json
                [
                    { "questionNumber": 49, "questionText": "Pick one.",
                      "options": ["A) 1", "B) 2", "C) 3", "D) 4"] },
                    { "questionNumber": 50, "questionText": "Pick many.",
                      "options": ["A) w", "B) x", "C) y", "D) z"] },
                    { "questionNumber": 55, "questionText": "Tag bits ____.",
                      "options": [] }
                ]
                ```"#
                    .to_string()),
            )
        }
    })
}

#[tokio::test]
async fn test_multi_question_page_merges_with_answer_key() {
    let extractor = BatchExtractor::new(multi_q_service(), &test_config());
    let merged = extractor
        .extract_multi_q(vec![1, 2, 3], "image/png", vec![4, 5, 6], "image/png")
        .await
        .expect("合并提取应该成功");

    assert_eq!(merged.len(), 3);

    // MCQ：命中 C
    assert_eq!(merged[0].correct_option.as_deref(), Some("C"));
    let marked: Vec<_> = merged[0]
        .question
        .options
        .iter()
        .map(|o| o.is_correct)
        .collect();
    assert_eq!(marked, vec![None, None, Some(true), None]);

    // MSQ：命中 B 和 D
    let marked: Vec<_> = merged[1]
        .question
        .options
        .iter()
        .map(|o| o.is_correct)
        .collect();
    assert_eq!(marked, vec![None, Some(true), None, Some(true)]);

    // 数值题：只带答案，不标选项
    assert_eq!(merged[2].correct_option.as_deref(), Some("122"));
    assert!(merged[2].question.options.is_empty());
}

#[tokio::test]
async fn test_chatty_fenced_output_with_trailing_comma_recovers() {
    let service = ScriptedService::new(|_request: &CompletionRequest, _attempt| {
        (
            Duration::ZERO,
            Ok(concat!(
                "Sure! Here's the JSON you asked for:\n",
                "```json\n",
                "{\"questionText\": \"What is 1+1?\", \"answerKey\": \"B) 2\",}\n",
                "```\n",
                "Let me know if you need anything else!"
            )
            .to_string()),
        )
    });

    let extractor = BatchExtractor::new(service, &test_config());
    let outcome = extractor.extract_batch("upload-6", &blocks(1)).await;

    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.results[0].question_text, "What is 1+1?");
    assert_eq!(outcome.results[0].answer_key.as_deref(), Some("B) 2"));
}

#[tokio::test(start_paused = true)]
async fn test_hung_call_becomes_recorded_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in = Arc::clone(&calls);

    // 响应永远比超时上限晚到
    let service = ScriptedService::new(move |_request: &CompletionRequest, _attempt| {
        calls_in.fetch_add(1, Ordering::SeqCst);
        (
            Duration::from_secs(10),
            Ok(question_json(0, "too late")),
        )
    });

    let config = Config {
        request_timeout_secs: 2,
        ..test_config()
    };
    let extractor = BatchExtractor::new(service, &config);
    let outcome = extractor.extract_batch("upload-8", &blocks(1)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2, "超时同样消耗重试预算");
    assert!(outcome.is_total_failure());
    assert_eq!(outcome.failures[0].index, 0);
    assert!(
        outcome.failures[0].reason.contains("超时"),
        "失败原因应说明超时: {}",
        outcome.failures[0].reason
    );
}

#[tokio::test]
async fn test_multi_q_upload_outcome_recorded_in_session_store() {
    let root = std::env::temp_dir().join(format!(
        "question-extract-multiq-{}",
        std::process::id()
    ));
    let input = root.join("uploads");
    let output = root.join("parsed");
    tokio::fs::create_dir_all(&input).await.unwrap();
    tokio::fs::write(input.join("u1_questions.png"), b"fake-png")
        .await
        .unwrap();
    tokio::fs::write(input.join("u1_answerkey.png"), b"fake-png")
        .await
        .unwrap();

    let config = Config {
        input_folder: input.to_string_lossy().into_owned(),
        output_folder: output.to_string_lossy().into_owned(),
        ..test_config()
    };

    let app = App::with_service(multi_q_service(), config);
    app.run().await.expect("处理应该成功");

    // 合并结果按 upload_id 进入会话存储，答案键回填到记录上
    let outcome = app
        .sessions()
        .get("u1_questions")
        .expect("会话里应该有这次上传");
    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.results[0].answer_key.as_deref(), Some("C"));
    assert_eq!(outcome.results[1].answer_key.as_deref(), Some("B,D"));
    assert_eq!(outcome.results[2].answer_key.as_deref(), Some("122"));
    assert_eq!(outcome.results[0].options[2].is_correct, Some(true));

    // 报告同样落盘
    assert!(tokio::fs::try_exists(output.join("u1_questions.json"))
        .await
        .unwrap());

    let _ = tokio::fs::remove_dir_all(&root).await;
}

#[tokio::test]
async fn test_empty_batch_returns_empty_outcome() {
    let service =
        ScriptedService::new(|_request: &CompletionRequest, _attempt| unreachable!("不应被调用"));

    let extractor = BatchExtractor::new(service, &test_config());
    let outcome = extractor.extract_batch("upload-7", &[]).await;

    assert!(outcome.results.is_empty());
    assert!(outcome.failures.is_empty());
    assert!(!outcome.is_total_failure());
}
