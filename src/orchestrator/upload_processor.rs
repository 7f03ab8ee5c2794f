//! 上传处理器 - 应用入口编排
//!
//! ## 职责
//!
//! 1. 扫描输入目录，识别三类上传：PDF 文档、单题截图、多题整页+答案键图片对
//! 2. PDF 走"抽文本 → 切块 → 批量提取"，图片走对应的视觉流程
//! 3. 结果写入会话存储并落盘为 JSON 报告
//! 4. 可选地把原始文件归档到外部存储（归档失败不影响提取）
//!
//! 文件级互不影响：一个文件处理失败只计入统计，继续处理下一个。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{error, info, warn};

use crate::clients::{CompletionService, LlmClient, StorageClient};
use crate::config::Config;
use crate::models::batch::{BatchOutcome, BatchStats, ExtractionFailure};
use crate::models::session::SessionStore;
use crate::orchestrator::batch_extractor::BatchExtractor;
use crate::services::document;
use crate::utils::logging;
use crate::utils::mime::{image_mime_for_path, is_image_path};

/// 一次待处理的上传
enum UploadJob {
    /// PDF 文档，切块后批量提取
    Pdf(PathBuf),
    /// 单题截图
    SingleImage(PathBuf),
    /// 多题整页图 + 答案键图
    MultiQ { questions: PathBuf, key: PathBuf },
}

impl UploadJob {
    fn primary_path(&self) -> &Path {
        match self {
            UploadJob::Pdf(p) | UploadJob::SingleImage(p) => p,
            UploadJob::MultiQ { questions, .. } => questions,
        }
    }
}

/// 应用主结构
///
/// 对补全服务泛型，生产入口固定用 `LlmClient`。
pub struct App<S = LlmClient> {
    config: Config,
    extractor: BatchExtractor<S>,
    storage: Option<StorageClient>,
    sessions: SessionStore,
}

impl App {
    /// 初始化应用（生产入口）
    pub fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(config.max_concurrent_requests, &config.llm_model_name);

        let client = LlmClient::new(&config);
        Ok(Self::with_service(client, config))
    }
}

impl<S: CompletionService> App<S> {
    /// 用任意补全服务组装应用
    pub fn with_service(service: S, config: Config) -> Self {
        let extractor = BatchExtractor::new(service, &config);
        let storage = StorageClient::from_url(&config.storage_upload_url);
        if storage.is_none() {
            info!("ℹ️ 未配置外部存储，跳过原始文件归档");
        }

        Self {
            config,
            extractor,
            storage,
            sessions: SessionStore::new(),
        }
    }

    /// 会话存储（按 upload_id 查询各次上传的结果）
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// 运行主流程：扫描输入目录并逐个处理上传
    pub async fn run(&self) -> Result<()> {
        let jobs = self.scan_input_folder().await?;
        if jobs.is_empty() {
            warn!("⚠️ 目录 {} 中没有可处理的文件", self.config.input_folder);
            return Ok(());
        }
        logging::log_files_found(jobs.len());

        let mut stats = BatchStats {
            total: jobs.len(),
            ..Default::default()
        };

        for (i, job) in jobs.iter().enumerate() {
            let name = job.primary_path().display();
            info!("\n[{}/{}] 处理: {}", i + 1, jobs.len(), name);

            match self.process_job(job).await {
                Ok(true) => stats.success += 1,
                Ok(false) => {
                    stats.failed += 1;
                    error!("❌ {} 一条结果都没有提取出来", name);
                }
                Err(e) => {
                    stats.failed += 1;
                    error!("❌ 处理 {} 失败: {:#}", name, e);
                }
            }
        }

        logging::print_final_stats(&stats);
        Ok(())
    }

    /// 扫描输入目录并配对多题/答案键图片
    ///
    /// 命名约定：`xxx_questions.png` 与 `xxx_answerkey.png` 视为一对；
    /// 落单的 `_answerkey` 图片没有可合并对象，跳过并警告。
    async fn scan_input_folder(&self) -> Result<Vec<UploadJob>> {
        let folder = Path::new(&self.config.input_folder);
        let mut entries = tokio::fs::read_dir(folder)
            .await
            .with_context(|| format!("无法读取输入目录: {}", self.config.input_folder))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut jobs = Vec::new();
        for path in &paths {
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s,
                None => continue,
            };
            let is_pdf = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);

            if is_pdf {
                jobs.push(UploadJob::Pdf(path.clone()));
            } else if is_image_path(path) {
                if stem.ends_with("_answerkey") {
                    // 由对应的 _questions 图片带走
                    if find_paired_key(&paths, &stem.replace("_answerkey", "_questions")).is_none()
                    {
                        warn!("⚠️ 答案键图片 {} 没有配对的题目图片，跳过", path.display());
                    }
                } else if stem.ends_with("_questions") {
                    match find_paired_key(&paths, &stem.replace("_questions", "_answerkey")) {
                        Some(key) => jobs.push(UploadJob::MultiQ {
                            questions: path.clone(),
                            key,
                        }),
                        None => {
                            warn!(
                                "⚠️ 题目图片 {} 没有配对的答案键图片，按单题处理",
                                path.display()
                            );
                            jobs.push(UploadJob::SingleImage(path.clone()));
                        }
                    }
                } else {
                    jobs.push(UploadJob::SingleImage(path.clone()));
                }
            }
        }

        Ok(jobs)
    }

    /// 处理一次上传，返回是否至少有一条成功结果
    async fn process_job(&self, job: &UploadJob) -> Result<bool> {
        let path = job.primary_path();
        let upload_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload")
            .to_string();

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("读取文件失败: {}", path.display()))?;

        self.archive_original(path, &bytes).await;

        let outcome = match job {
            UploadJob::Pdf(_) => self.process_pdf(&upload_id, &bytes).await?,
            UploadJob::SingleImage(p) => self.process_single_image(p, bytes).await,
            UploadJob::MultiQ { key, .. } => {
                return self.process_multi_q(&upload_id, path, bytes, key).await;
            }
        };

        let ok = !outcome.is_total_failure() && !outcome.results.is_empty();
        self.sessions.insert(&upload_id, outcome.clone());
        self.write_report(
            &upload_id,
            json!({
                "uploadId": upload_id,
                "totalExtracted": outcome.results.len(),
                "results": outcome.results,
                "failures": outcome.failures,
            }),
        )
        .await?;

        Ok(ok)
    }

    /// PDF：抽文本 → 按题号切块 → 批量提取
    async fn process_pdf(&self, upload_id: &str, bytes: &[u8]) -> Result<BatchOutcome> {
        let text = document::extract_pdf_text(bytes)?;
        let blocks = document::split_question_blocks(&text);
        if blocks.is_empty() {
            warn!("⚠️ 上传 {} 的 PDF 中没有识别到题目块", upload_id);
            return Ok(BatchOutcome::default());
        }
        Ok(self.extractor.extract_batch(upload_id, &blocks).await)
    }

    /// 单题截图：一次视觉调用
    async fn process_single_image(&self, path: &Path, bytes: Vec<u8>) -> BatchOutcome {
        let mime = match image_mime_for_path(path) {
            Some(m) => m,
            None => {
                return BatchOutcome {
                    results: vec![],
                    failures: vec![ExtractionFailure {
                        index: 0,
                        reason: format!("无法识别的图片类型: {}", path.display()),
                    }],
                }
            }
        };

        match self.extractor.flow().extract_question_image(bytes, mime).await {
            Ok(question) => BatchOutcome {
                results: vec![question],
                failures: vec![],
            },
            Err(e) => BatchOutcome {
                results: vec![],
                failures: vec![ExtractionFailure {
                    index: 0,
                    reason: e.to_string(),
                }],
            },
        }
    }

    /// 多题整页 + 答案键：分别提取后按题号合并
    async fn process_multi_q(
        &self,
        upload_id: &str,
        questions_path: &Path,
        question_bytes: Vec<u8>,
        key_path: &Path,
    ) -> Result<bool> {
        let question_mime = image_mime_for_path(questions_path)
            .context("题目图片类型无法识别")?;
        let key_mime = image_mime_for_path(key_path).context("答案键图片类型无法识别")?;
        let key_bytes = tokio::fs::read(key_path)
            .await
            .with_context(|| format!("读取文件失败: {}", key_path.display()))?;

        let merged = self
            .extractor
            .extract_multi_q(question_bytes, question_mime, key_bytes, key_mime)
            .await?;

        // 合并结果同样进入会话存储，correct_option 回填为记录的答案键
        let outcome = BatchOutcome {
            results: merged
                .iter()
                .map(|m| {
                    let mut question = m.question.clone();
                    if m.correct_option.is_some() {
                        question.answer_key = m.correct_option.clone();
                    }
                    question
                })
                .collect(),
            failures: Vec::new(),
        };
        self.sessions.insert(upload_id, outcome);

        let ok = !merged.is_empty();
        self.write_report(
            upload_id,
            json!({
                "uploadId": upload_id,
                "totalExtracted": merged.len(),
                "data": merged,
            }),
        )
        .await?;

        Ok(ok)
    }

    /// 归档原始文件到外部存储，失败只警告
    async fn archive_original(&self, path: &Path, bytes: &[u8]) {
        let storage = match &self.storage {
            Some(s) => s,
            None => return,
        };
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload.bin");

        match storage.upload(file_name, bytes.to_vec()).await {
            Ok(url) => info!("☁️ 已归档原始文件: {}", url),
            Err(e) => warn!("⚠️ 归档 {} 失败（不影响提取）: {}", file_name, e),
        }
    }

    /// 把提取报告写入输出目录
    async fn write_report(&self, upload_id: &str, report: serde_json::Value) -> Result<()> {
        let folder = Path::new(&self.config.output_folder);
        tokio::fs::create_dir_all(folder)
            .await
            .with_context(|| format!("无法创建输出目录: {}", self.config.output_folder))?;

        let out_path = folder.join(format!("{}.json", upload_id));
        let content = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&out_path, content)
            .await
            .with_context(|| format!("写入报告失败: {}", out_path.display()))?;

        info!("💾 报告已写入: {}", out_path.display());
        Ok(())
    }
}

/// 在同目录文件列表里找答案键配对（任意受支持的图片扩展名）
fn find_paired_key(paths: &[PathBuf], want_stem: &str) -> Option<PathBuf> {
    paths
        .iter()
        .find(|p| {
            p.file_stem().and_then(|s| s.to_str()) == Some(want_stem)
                && image_mime_for_path(p).is_some()
        })
        .cloned()
}
