//! 报告写入服务 - 业务能力层
//!
//! 只负责把报告和失败记录写到磁盘，不关心流程

use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::debug;

use crate::error::{AppResult, FileError};
use crate::models::{ProcessingResult, StressTestReport};

/// 报告写入服务
pub struct ReportWriter {
    report_file_path: String,
    log_file_path: String,
}

impl ReportWriter {
    pub fn new(report_file_path: impl Into<String>, log_file_path: impl Into<String>) -> Self {
        Self {
            report_file_path: report_file_path.into(),
            log_file_path: log_file_path.into(),
        }
    }

    /// 以 camelCase JSON 写出完整报告
    pub fn write_report(&self, report: &StressTestReport) -> AppResult<()> {
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&self.report_file_path, json).map_err(|source| FileError::WriteFailed {
            path: self.report_file_path.clone(),
            source,
        })?;
        debug!("报告已写入: {}", self.report_file_path);
        Ok(())
    }

    /// 把失败的文档追加到运行日志
    pub fn append_failure(&self, result: &ProcessingResult) -> AppResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .map_err(|source| FileError::WriteFailed {
                path: self.log_file_path.clone(),
                source,
            })?;

        let line = format!(
            "文档 {} | {} | {} | {}\n",
            result.index + 1,
            result.file_name,
            result.error.as_deref().unwrap_or("-"),
            result.validation_errors.join("; ")
        );

        file.write_all(line.as_bytes())
            .map_err(|source| FileError::WriteFailed {
                path: self.log_file_path.clone(),
                source,
            })?;
        Ok(())
    }

    pub fn report_file_path(&self) -> &str {
        &self.report_file_path
    }
}
