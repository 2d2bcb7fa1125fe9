//! OCR 能力
//!
//! 按顺序尝试多个 provider：未配置的直接跳过，失败的记录后继续下一个，
//! 全部不可用时返回 [`OcrError::AllProvidersFailed`]

pub mod ocr_space;
pub mod tesseract;
pub mod vision;

use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::config::OcrConfig;
use crate::error::{AppResult, OcrError};
use crate::utils::logging::truncate_text;

pub use ocr_space::OcrSpaceProvider;
pub use tesseract::TesseractProvider;
pub use vision::VisionProvider;

/// 单个 OCR provider
#[async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 缺少凭证的 provider 会被跳过
    fn is_configured(&self) -> bool {
        true
    }

    async fn try_extract(&self, bytes: &[u8], mime_type: &str) -> AppResult<String>;
}

/// OCR 降级链
pub struct OcrOrchestrator {
    providers: Vec<Box<dyn OcrProvider>>,
}

impl OcrOrchestrator {
    pub fn new(providers: Vec<Box<dyn OcrProvider>>) -> Self {
        Self { providers }
    }

    /// 默认顺序：Vision LLM → OCR.space → 本地 Tesseract
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(vec![
            Box::new(VisionProvider::new(config)),
            Box::new(OcrSpaceProvider::new(config)),
            Box::new(TesseractProvider::new(config)),
        ])
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 提取文本，返回 NFC 规范化后的结果
    pub async fn extract_text(&self, bytes: &[u8], mime_type: &str) -> AppResult<String> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            if !provider.is_configured() {
                debug!("OCR provider {} 未配置，跳过", provider.name());
                attempts.push(format!("{}: 未配置", provider.name()));
                continue;
            }

            let start = Instant::now();
            match provider.try_extract(bytes, mime_type).await {
                Ok(text) => {
                    let text: String = text.nfc().collect();
                    info!(
                        "✓ OCR 完成 ({}, {} 字符, {}ms)",
                        provider.name(),
                        text.chars().count(),
                        start.elapsed().as_millis()
                    );
                    debug!("OCR 文本预览: {}", truncate_text(&text, 120));
                    return Ok(text);
                }
                Err(e) => {
                    warn!("⚠️ OCR provider {} 失败，尝试下一个: {}", provider.name(), e);
                    attempts.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(OcrError::AllProvidersFailed { attempts }.into())
    }
}

/// 把字节编码为 `data:<mime>;base64,...`
pub(crate) fn data_url(bytes: &[u8], mime_type: &str) -> String {
    use base64::Engine;
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
