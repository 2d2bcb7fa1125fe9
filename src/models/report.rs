use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, ConfigError, OcrError, ParseError, ValidationError};
use crate::models::enrollment::MappedSubject;

/// 处理模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    /// 逐个处理
    Sequential,
    /// 全部同时处理
    Parallel,
    /// 分批处理，批内并发
    Batch,
}

impl fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessMode::Sequential => "sequential",
            ProcessMode::Parallel => "parallel",
            ProcessMode::Batch => "batch",
        };
        f.write_str(name)
    }
}

impl FromStr for ProcessMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ProcessMode::Sequential),
            "parallel" => Ok(ProcessMode::Parallel),
            "batch" => Ok(ProcessMode::Batch),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// 校验统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSummary {
    pub registration_number: String,
    pub student_name: String,
    pub total_subjects: usize,
    pub new_subjects: usize,
    pub duplicate_subjects: usize,
    pub unmapped_subjects: usize,
    pub valid_subjects: usize,
    pub current_enrollment_count: usize,
    pub would_exceed_limit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_slots: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_duplicate_document: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub has_pending_document: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub registration_mismatch: bool,
}

/// 校验链的结果
///
/// `failure` 为终止性失败的类型；为 `None` 时文档可被接受，
/// `errors` 中仍可能包含非终止性的提示
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
    pub summary: ValidationSummary,
    pub mapped_subjects: Vec<MappedSubject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        self.failure.is_none()
    }
}

/// 单个文档失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    AllProvidersFailed,
    ParseInvalid,
    DuplicateDocument,
    RegistrationMismatch,
    PendingDocumentExists,
    QuotaExceeded,
    Store,
    Unexpected,
}

impl From<&ValidationError> for FailureKind {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::DuplicateDocument { .. } => FailureKind::DuplicateDocument,
            ValidationError::RegistrationMismatch { .. } => FailureKind::RegistrationMismatch,
            ValidationError::PendingDocumentExists { .. } => FailureKind::PendingDocumentExists,
            ValidationError::QuotaExceeded { .. } => FailureKind::QuotaExceeded,
        }
    }
}

impl From<&AppError> for FailureKind {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Ocr(OcrError::AllProvidersFailed { .. }) => FailureKind::AllProvidersFailed,
            AppError::Parse(ParseError::ParseInvalid { .. }) => FailureKind::ParseInvalid,
            AppError::Validation(validation) => FailureKind::from(validation),
            AppError::Store(_) => FailureKind::Store,
            _ => FailureKind::Unexpected,
        }
    }
}

/// 单个文档各阶段耗时（毫秒）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub ocr_duration: u64,
    pub parse_duration: u64,
    pub validation_duration: u64,
    pub db_duration: u64,
}

/// 单个文档的处理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// 提交时的序号，并发模式下用于恢复顺序
    pub index: usize,
    pub file_name: String,
    pub file_size: usize,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub success: bool,
    /// 总耗时（毫秒）
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings: Option<StageTimings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ValidationSummary>,
    pub validation_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl ProcessingResult {
    /// 任务本身崩溃时的兜底结果
    pub fn crashed(index: usize, file_name: &str, message: impl Into<String>) -> Self {
        Self {
            index,
            file_name: file_name.to_string(),
            file_size: 0,
            mime_type: String::new(),
            fingerprint: None,
            success: false,
            duration: 0,
            timings: None,
            extracted_data: None,
            validation_errors: Vec::new(),
            error: Some(message.into()),
            error_kind: Some(FailureKind::Unexpected),
        }
    }
}

/// 运行前后的资源差值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDelta {
    /// 常驻内存差值（字节），平台不支持时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_bytes: Option<i64>,
}

/// 压测报告
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressTestReport {
    pub total_files: usize,
    pub processed_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,
    /// 总耗时（毫秒）
    pub total_duration: u64,
    pub average_duration: u64,
    pub min_duration: u64,
    pub max_duration: u64,
    /// 每秒处理文档数，保留两位小数
    pub throughput: f64,
    pub mode: ProcessMode,
    pub results: Vec<ProcessingResult>,
    pub system_metrics: ResourceDelta,
}
