//! OCR.space 托管 OCR provider

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{data_url, OcrProvider};
use crate::config::OcrConfig;
use crate::error::{AppError, AppResult};

const PROVIDER: &str = "ocr.space";

pub struct OcrSpaceProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
    engine: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<serde_json::Value>,
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

impl OcrSpaceProvider {
    pub fn new(config: &OcrConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: config.ocr_space_api_key.clone(),
            url: config.ocr_space_url.clone(),
            engine: config.ocr_space_engine,
        }
    }
}

/// OCR.space 的 `filetype` 参数
fn file_type(mime_type: &str) -> &'static str {
    match mime_type {
        "application/pdf" => "PDF",
        "image/png" => "PNG",
        _ => "JPG",
    }
}

fn unavailable(e: impl std::fmt::Display) -> AppError {
    AppError::provider_unavailable(PROVIDER, e.to_string())
}

/// 从响应中取出第一页文本
fn interpret(response: OcrSpaceResponse) -> Result<String, String> {
    if response.is_errored_on_processing {
        let message = match response.error_message {
            Some(serde_json::Value::Array(items)) => items
                .first()
                .and_then(|v| v.as_str())
                .map(str::to_string),
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        };
        return Err(message.unwrap_or_else(|| "OCR.space processing error".to_string()));
    }

    response
        .parsed_results
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.parsed_text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| "No text extracted from OCR.space".to_string())
}

#[async_trait]
impl OcrProvider for OcrSpaceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn try_extract(&self, bytes: &[u8], mime_type: &str) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| unavailable("OCR_SPACE_API_KEY 未配置"))?;

        let form = reqwest::multipart::Form::new()
            .text("base64Image", data_url(bytes, mime_type))
            .text("apikey", api_key.clone())
            .text("filetype", file_type(mime_type))
            .text("OCREngine", self.engine.to_string());

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(unavailable)?;

        debug!("OCR.space 响应状态: {}", response.status());

        let body: OcrSpaceResponse = response.json().await.map_err(unavailable)?;
        interpret(body).map_err(unavailable)
    }
}
