//! 本地 Tesseract provider，无需凭证，作为最后的兜底

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::OcrProvider;
use crate::config::OcrConfig;
use crate::error::{AppError, AppResult};

const PROVIDER: &str = "tesseract";

/// 有效文本的最少字符数
const MIN_TEXT_CHARS: usize = 10;

pub struct TesseractProvider {
    binary: String,
    language: String,
    timeout: Duration,
}

impl TesseractProvider {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_bin.clone(),
            language: config.tesseract_lang.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn run(&self, bytes: &[u8]) -> AppResult<String> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", self.language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| unavailable(format!("无法启动 {}: {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| unavailable("无法获取 stdin"))?;
        let input = bytes.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await.map_err(unavailable)?;
        writer
            .await
            .map_err(unavailable)?
            .map_err(|e| unavailable(format!("写入图片失败: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unavailable(format!(
                "退出码 {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn unavailable(e: impl std::fmt::Display) -> AppError {
    AppError::provider_unavailable(PROVIDER, e.to_string())
}

fn check_sufficient(text: String) -> AppResult<String> {
    if text.trim().chars().count() < MIN_TEXT_CHARS {
        return Err(unavailable("Insufficient text extracted from Tesseract"));
    }
    Ok(text)
}

#[async_trait]
impl OcrProvider for TesseractProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn try_extract(&self, bytes: &[u8], _mime_type: &str) -> AppResult<String> {
        let text = tokio::time::timeout(self.timeout, self.run(bytes))
            .await
            .map_err(|_| unavailable(format!("超时 ({}s)", self.timeout.as_secs())))??;
        check_sufficient(text)
    }
}
