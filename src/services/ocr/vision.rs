//! Vision LLM provider
//!
//! 使用 `async-openai` 调用兼容 OpenAI 的多模态接口，把图片以 data URL 发送

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
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{data_url, OcrProvider};
use crate::config::OcrConfig;
use crate::error::{AppError, AppResult};

const PROVIDER: &str = "openai-vision";

const EXTRACTION_PROMPT: &str = "Extract ALL text from this enrollment document (boleta de inscripción). \
Return ONLY the raw text, preserving line breaks and formatting. \
Include: registration number, student name, and complete table of subjects with SIGLA, GRUPO, and MATERIA columns.";

pub struct VisionProvider {
    client: Option<Client<OpenAIConfig>>,
    model_name: String,
    max_tokens: u32,
    timeout: Duration,
}

impl VisionProvider {
    pub fn new(config: &OcrConfig) -> Self {
        let client = config.openai_api_key.as_ref().map(|key| {
            let openai_config = OpenAIConfig::new()
                .with_api_key(key)
                .with_api_base(&config.openai_api_base_url);
            Client::with_config(openai_config)
        });

        Self {
            client,
            model_name: config.vision_model.clone(),
            max_tokens: config.vision_max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

fn unavailable(e: impl std::fmt::Display) -> AppError {
    AppError::provider_unavailable(PROVIDER, e.to_string())
}

#[async_trait]
impl OcrProvider for VisionProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn try_extract(&self, bytes: &[u8], mime_type: &str) -> AppResult<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| unavailable("OPENAI_API_KEY 未配置"))?;

        debug!("调用 Vision API，模型: {}，图片 {} 字节", self.model_name, bytes.len());

        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: EXTRACTION_PROMPT.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: data_url(bytes, mime_type),
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()
            .map_err(unavailable)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .max_tokens(self.max_tokens)
            .build()
            .map_err(unavailable)?;

        let response = tokio::time::timeout(self.timeout, client.chat().create(request))
            .await
            .map_err(|_| unavailable(format!("请求超时 ({}s)", self.timeout.as_secs())))?
            .map_err(unavailable)?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| unavailable("Vision 返回内容为空"))?;

        Ok(content)
    }
}
