//! 批量提取器 - 编排层
//!
//! ## 职责
//!
//! 1. **并发控制**：用 Semaphore 限制同时在途的模型请求数
//! 2. **失败隔离**：单个块的失败只产生一条失败记录，绝不中断兄弟块
//! 3. **确定性聚合**：完成顺序随意，返回前按 source_index 重排
//! 4. **向下委托**：单个块的提取细节交给 workflow::ExtractFlow
//!
//! 在途任务各自持有自己的块和结果槽位，没有共享可变状态，
//! 聚合只发生在所有任务落定之后。调用方丢弃整个 future 即取消批次，
//! 在途请求随之被放弃。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::clients::CompletionService;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::batch::{BatchOutcome, ExtractionFailure, RawQuestionBlock};
use crate::models::question::MergedQuestion;
use crate::services::merger::merge_questions_and_keys;
use crate::workflow::{BlockCtx, ExtractFlow};

/// 批量提取器
pub struct BatchExtractor<S> {
    flow: ExtractFlow<S>,
    max_concurrent: usize,
}

impl<S: CompletionService> BatchExtractor<S> {
    /// 创建新的批量提取器
    pub fn new(service: S, config: &Config) -> Self {
        Self {
            flow: ExtractFlow::new(service, config),
            max_concurrent: config.max_concurrent_requests.max(1),
        }
    }

    /// 单块流程的入口（图片类一次性提取走这里）
    pub fn flow(&self) -> &ExtractFlow<S> {
        &self.flow
    }

    /// 批量提取文本题目块
    ///
    /// 永不整体失败：每个块要么进 results 要么进 failures，
    /// results 按 source_index 升序，与派发顺序和完成顺序无关。
    pub async fn extract_batch(
        &self,
        upload_id: &str,
        blocks: &[RawQuestionBlock],
    ) -> BatchOutcome {
        if blocks.is_empty() {
            return BatchOutcome::default();
        }

        info!(
            "📦 开始批量提取: {} 个题目块，最大并发 {}",
            blocks.len(),
            self.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let tasks = blocks.iter().map(|block| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            block.source_index,
                            Err(AppError::Other("并发信号量已关闭".to_string())),
                        )
                    }
                };

                let ctx = BlockCtx::new(upload_id, block.source_index);
                let result = self.flow.extract_question_text(&ctx, &block.text).await;
                (block.source_index, result)
            }
        });

        let settled = futures::future::join_all(tasks).await;

        // 所有任务已落定，聚合无需任何同步
        let mut successes = Vec::with_capacity(settled.len());
        let mut failures = Vec::new();
        for (index, result) in settled {
            match result {
                Ok(question) => successes.push((index, question)),
                Err(e) => {
                    error!("[上传 {} 块 {}] ❌ 提取失败: {}", upload_id, index, e);
                    failures.push(ExtractionFailure {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        successes.sort_by_key(|(index, _)| *index);
        failures.sort_by_key(|f| f.index);

        info!(
            "✓ 批量提取完成: 成功 {}/{}, 失败 {}",
            successes.len(),
            blocks.len(),
            failures.len()
        );

        BatchOutcome {
            results: successes.into_iter().map(|(_, q)| q).collect(),
            failures,
        }
    }

    /// 多题图片 + 答案键图片的合并提取
    ///
    /// 两张图分别提取后按题号合并；这里的失败是上传级的
    /// （任一张图提取不出来，整个合并就无从谈起）。
    pub async fn extract_multi_q(
        &self,
        question_image: Vec<u8>,
        question_mime: &str,
        key_image: Vec<u8>,
        key_mime: &str,
    ) -> AppResult<Vec<MergedQuestion>> {
        let questions = self
            .flow
            .extract_questions_image(question_image, question_mime)
            .await?;
        let keys = self
            .flow
            .extract_answer_key_image(key_image, key_mime)
            .await?;

        let merged = merge_questions_and_keys(questions, &keys);
        info!("✓ 合并完成: {} 道题", merged.len());
        Ok(merged)
    }
}
