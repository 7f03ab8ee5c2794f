//! LLM 客户端 - 客户端层
//!
//! 封装所有与补全 API 相关的调用逻辑，只暴露"给提示词、回自由文本"
//! 这一种能力。响应按契约只是"期望包含 JSON 的文本"，不保证合法，
//! 解析交给下游。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use std::future::Future;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use base64::Engine;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};

/// 视觉请求附带的图片
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// 一次补全请求
///
/// 文本模式只有提示词；视觉模式额外带一张图片。
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub image: Option<ImagePart>,
}

impl CompletionRequest {
    /// 纯文本请求
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    /// 视觉请求
    pub fn vision(prompt: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(ImagePart {
                bytes,
                mime_type: mime_type.into(),
            }),
        }
    }
}

/// 补全服务接口
///
/// 编排层依赖这个接口而不是具体客户端，测试时可以换成脚本化假服务。
pub trait CompletionService: Send + Sync {
    /// 调用外部模型，返回其原始文本输出
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = AppResult<String>> + Send;
}

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 把图片字节编码成 data URL，随消息内联发送
    fn to_data_url(image: &ImagePart) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        format!("data:{};base64,{}", image.mime_type, encoded)
    }
}

impl CompletionService for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", request.prompt.len());

        // 构建用户消息内容（支持图片）
        let user_msg = if let Some(image) = &request.image {
            debug!(
                "使用 Vision API，图片 {} 字节 ({})",
                image.bytes.len(),
                image.mime_type
            );

            let content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
                ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartText {
                        text: request.prompt.clone(),
                    },
                ),
                ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: Self::to_data_url(image),
                            detail: Some(ImageDetail::Auto),
                        },
                    },
                ),
            ];

            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(
                    content_parts,
                ))
                .build()
                .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?
        } else {
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()
                .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?
        };

        let messages = vec![ChatCompletionRequestMessage::User(user_msg)];

        // 提取任务要求确定性输出，温度固定为 0
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(4096u32)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyContent {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_encoding() {
        let image = ImagePart {
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            mime_type: "image/png".to_string(),
        };
        let url = LlmClient::to_data_url(&image);
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.ends_with("iVBORw=="));
    }

    #[test]
    fn test_request_constructors() {
        let t = CompletionRequest::text("p");
        assert!(t.image.is_none());

        let v = CompletionRequest::vision("p", vec![1, 2, 3], "image/png");
        assert_eq!(v.image.unwrap().mime_type, "image/png");
    }
}
