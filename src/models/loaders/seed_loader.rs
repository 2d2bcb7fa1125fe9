//! 内存存储的种子数据
//!
//! 压测时用 TOML 文件描述学期、科目、班组、开课和已有学生/文档

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

use crate::error::{AppError, AppResult, FileError};
use crate::models::{DocumentStatus, SubjectKey};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub terms: Vec<SeedTerm>,
    #[serde(default)]
    pub subjects: Vec<SeedSubject>,
    /// 班组代码列表
    #[serde(default)]
    pub sections: Vec<String>,
    #[serde(default)]
    pub offerings: Vec<SeedOffering>,
    #[serde(default)]
    pub students: Vec<SeedStudent>,
    #[serde(default)]
    pub documents: Vec<SeedDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTerm {
    pub id: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSubject {
    pub code: String,
    pub name: String,
}

/// 某学期某科目某班组的开课及其消息群组
#[derive(Debug, Clone, Deserialize)]
pub struct SeedOffering {
    pub id: u64,
    pub term: String,
    pub sigla: String,
    pub grupo: String,
    pub group_jid: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedStudent {
    pub identity: String,
    pub registration_number: String,
    pub name: String,
    /// 已经加入群组的科目
    #[serde(default)]
    pub accepted: Vec<SubjectKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedDocument {
    pub fingerprint: String,
    pub identity: Option<String>,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl SeedCatalog {
    pub fn from_toml_str(content: &str, path: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            FileError::TomlParseFailed {
                path: path.to_string(),
                source,
            }
            .into()
        })
    }
}

/// 从 TOML 文件加载种子数据
pub async fn load_seed_file(path: &Path) -> AppResult<SeedCatalog> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(display.clone(), e))?;

    let catalog = SeedCatalog::from_toml_str(&content, &display)?;
    tracing::info!(
        "种子数据: {} 个学期, {} 个科目, {} 个开课, {} 个学生",
        catalog.terms.len(),
        catalog.subjects.len(),
        catalog.offerings.len(),
        catalog.students.len()
    );
    Ok(catalog)
}
