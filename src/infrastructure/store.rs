//! 外部存储能力
//!
//! 学生、科目、群组与学期数据都由外部存储持有，流水线只通过
//! [`EnrollmentStore`] 读取，并在启用持久化时写入一次提交结果

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::{DocumentFingerprint, DocumentStatus, MappedSubject, ParsedDocument, SubjectKey};

pub type TermId = String;

/// 已存储的文档记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: u64,
    pub fingerprint: String,
    pub identity: Option<String>,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// 开课查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferingLookup {
    Resolved {
        id: u64,
        subject_name: String,
        /// 消息群组标识，未配置时为 None
        group_jid: Option<String>,
    },
    UnknownSubject,
    UnknownSection,
    /// 科目和班组都存在，但本学期没有有效开课
    NotOffered,
}

/// 一次成功校验后写入存储的内容
#[derive(Debug, Clone)]
pub struct Submission {
    pub identity: String,
    pub registration_number: String,
    pub student_name: String,
    pub fingerprint: DocumentFingerprint,
    pub parsed: ParsedDocument,
    pub mapped_subjects: Vec<MappedSubject>,
}

/// 报名数据存储
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn find_document_by_fingerprint(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> AppResult<Option<DocumentRecord>>;

    /// 身份已登记的注册号
    async fn identity_registration(&self, identity: &str) -> AppResult<Option<String>>;

    /// 该身份最近一份处于 `statuses` 中的文档
    async fn find_pending_document(
        &self,
        identity: &str,
        statuses: &[DocumentStatus],
    ) -> AppResult<Option<DocumentRecord>>;

    /// 已经加入群组的科目
    async fn accepted_subjects(&self, identity: &str) -> AppResult<Vec<SubjectKey>>;

    async fn resolve_offering(&self, term: &str, sigla: &str, grupo: &str) -> AppResult<OfferingLookup>;

    async fn active_term(&self) -> AppResult<Option<TermId>>;

    /// 按指纹幂等写入
    async fn persist(&self, submission: &Submission) -> AppResult<()>;
}
