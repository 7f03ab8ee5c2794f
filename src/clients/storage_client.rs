//! 对象存储客户端 - 客户端层
//!
//! 只负责把原始上传文件归档到对象存储并拿回访问 URL，
//! 与提取正确性无关；未配置上传地址时整个能力关闭。

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// 对象存储客户端
pub struct StorageClient {
    http: reqwest::Client,
    upload_url: String,
}

impl StorageClient {
    /// 创建客户端；upload_url 为空时返回 None（能力关闭）
    pub fn from_url(upload_url: &str) -> Option<Self> {
        if upload_url.trim().is_empty() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            upload_url: upload_url.to_string(),
        })
    }

    /// 上传一个文件，返回存储侧 URL
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        debug!("上传原始文件到对象存储: {} ({} 字节)", file_name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("对象存储上传失败: {}", e);
                AppError::Other(format!("对象存储上传失败: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Other(format!(
                "对象存储返回错误状态: {}",
                response.status()
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Other(format!("对象存储响应解析失败: {}", e)))?;

        Ok(parsed.url)
    }
}
