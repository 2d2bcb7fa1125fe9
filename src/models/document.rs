use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 扩展名 → MIME 类型
static MIME_BY_EXTENSION: phf::Map<&'static str, &'static str> = phf_map! {
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "png" => "image/png",
    "webp" => "image/webp",
    "pdf" => "application/pdf",
};

/// 根据扩展名查找支持的 MIME 类型（不区分大小写）
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    MIME_BY_EXTENSION
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
}

/// 待处理的原始文档，创建后不可变
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Vec<u8>,
    mime_type: String,
    file_name: String,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_size(&self) -> usize {
        self.bytes.len()
    }
}

/// 文档内容指纹（SHA-256，64 位小写十六进制）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentFingerprint(String);

impl DocumentFingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 文档处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Confirmed,
    Processing,
    Completed,
    Failed,
    Expired,
}

impl DocumentStatus {
    /// 尚未处理完成的状态，同一学生同时只能有一份
    pub const UNRESOLVED: [DocumentStatus; 3] = [
        DocumentStatus::Pending,
        DocumentStatus::Confirmed,
        DocumentStatus::Processing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Confirmed => "confirmed",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
            DocumentStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(mime_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("pdf"), Some("application/pdf"));
        assert_eq!(mime_for_extension("gif"), None);
    }
}
