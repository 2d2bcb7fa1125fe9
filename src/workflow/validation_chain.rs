//! 校验链 - 流程层
//!
//! 按固定顺序执行业务检查，遇到终止性失败立即停止：
//! 1. 重复文档（指纹）
//! 2. 身份与注册号一致
//! 3. 未完成文档互斥
//! 4. 科目去重 `(sigla, grupo)`
//! 5. 科目上限
//! 6. 科目 → 消息群组映射（失败只降级该科目）

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ValidationConfig;
use crate::error::{AppResult, ValidationError};
use crate::infrastructure::{EnrollmentStore, OfferingLookup};
use crate::models::{
    DocumentFingerprint, FailureKind, MappedSubject, ParsedDocument, SubjectKey, SubjectRecord,
    ValidationOutcome, ValidationSummary,
};

pub const REASON_NO_ACTIVE_TERM: &str = "No active semester";
pub const REASON_UNKNOWN_SUBJECT: &str = "Subject not found in database";
pub const REASON_UNKNOWN_SECTION: &str = "Group not found in database";
pub const REASON_NO_GROUP: &str = "WhatsApp group not configured";

/// 校验链
pub struct ValidationChain {
    store: Arc<dyn EnrollmentStore>,
    config: ValidationConfig,
}

impl ValidationChain {
    pub fn new(store: Arc<dyn EnrollmentStore>, config: ValidationConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// 执行校验
    ///
    /// 业务失败体现在返回的 [`ValidationOutcome::failure`] 中；
    /// 只有存储查询失败才返回 `Err`
    pub async fn validate(
        &self,
        fingerprint: &DocumentFingerprint,
        parsed: &ParsedDocument,
        identity: &str,
    ) -> AppResult<ValidationOutcome> {
        let registration = parsed.registration_number.clone().unwrap_or_default();
        let mut summary = ValidationSummary {
            registration_number: registration.clone(),
            student_name: parsed.student_name.clone().unwrap_or_default(),
            total_subjects: parsed.subjects.len(),
            ..Default::default()
        };

        // 1. 重复文档
        if let Some(existing) = self.store.find_document_by_fingerprint(fingerprint).await? {
            summary.is_duplicate_document = true;
            return Ok(terminal(
                ValidationError::DuplicateDocument {
                    fingerprint: existing.fingerprint,
                    uploaded_at: existing.uploaded_at,
                },
                summary,
            ));
        }

        // 2. 身份一致性
        if let Some(expected) = self.store.identity_registration(identity).await? {
            if expected != registration {
                summary.registration_mismatch = true;
                return Ok(terminal(
                    ValidationError::RegistrationMismatch {
                        expected,
                        received: registration,
                    },
                    summary,
                ));
            }
        }

        // 3. 未完成文档
        if let Some(pending) = self
            .store
            .find_pending_document(identity, &self.config.pending_statuses)
            .await?
        {
            summary.has_pending_document = true;
            return Ok(terminal(
                ValidationError::PendingDocumentExists {
                    status: pending.status.to_string(),
                },
                summary,
            ));
        }

        // 4. 科目去重
        let accepted = self.store.accepted_subjects(identity).await?;
        let (new_subjects, duplicates) = split_new_subjects(&parsed.subjects, &accepted);
        let current = accepted.len();
        summary.current_enrollment_count = current;
        summary.new_subjects = new_subjects.len();
        summary.duplicate_subjects = duplicates.len();

        // 5. 上限
        let limit = self.config.max_subjects;
        let total = current + new_subjects.len();
        if total > limit {
            let remaining = limit.saturating_sub(current);
            summary.would_exceed_limit = true;
            summary.remaining_slots = Some(remaining);
            return Ok(terminal(
                ValidationError::QuotaExceeded {
                    current,
                    new: new_subjects.len(),
                    total,
                    limit,
                    remaining,
                },
                summary,
            ));
        }

        // 6. 群组映射
        let mapped = self.map_to_groups(new_subjects).await?;
        let unmapped = mapped.iter().filter(|s| !s.can_add).count();
        summary.unmapped_subjects = unmapped;
        summary.valid_subjects = mapped.len() - unmapped;

        let mut errors = Vec::new();
        if summary.new_subjects == 0 && summary.duplicate_subjects > 0 {
            errors.push("Todas las materias de la boleta ya están inscritas".to_string());
        }
        if unmapped > 0 {
            errors.push(format!(
                "{} materia(s) no tienen grupo de WhatsApp configurado",
                unmapped
            ));
        }

        Ok(ValidationOutcome {
            errors,
            summary,
            mapped_subjects: mapped,
            failure: None,
        })
    }

    async fn map_to_groups(&self, subjects: Vec<SubjectRecord>) -> AppResult<Vec<MappedSubject>> {
        let Some(term) = self.store.active_term().await? else {
            warn!("⚠️ 没有激活的学期，{} 个科目无法映射", subjects.len());
            return Ok(subjects
                .into_iter()
                .map(|s| MappedSubject::rejected(s, REASON_NO_ACTIVE_TERM))
                .collect());
        };

        let mut mapped = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let lookup = self
                .store
                .resolve_offering(&term, &subject.sigla, &subject.grupo)
                .await?;

            let entry = match lookup {
                OfferingLookup::Resolved {
                    id,
                    subject_name,
                    group_jid: Some(jid),
                } => MappedSubject {
                    subject: SubjectRecord {
                        materia: subject_name,
                        ..subject
                    },
                    can_add: true,
                    reason: None,
                    group_materia_id: Some(id),
                    group_jid: Some(jid),
                },
                OfferingLookup::Resolved { group_jid: None, .. } | OfferingLookup::NotOffered => {
                    MappedSubject::rejected(subject, REASON_NO_GROUP)
                }
                OfferingLookup::UnknownSubject => MappedSubject::rejected(subject, REASON_UNKNOWN_SUBJECT),
                OfferingLookup::UnknownSection => MappedSubject::rejected(subject, REASON_UNKNOWN_SECTION),
            };
            debug!(
                "映射 {}-{}: {}",
                entry.subject.sigla,
                entry.subject.grupo,
                entry.reason.as_deref().unwrap_or("ok")
            );
            mapped.push(entry);
        }
        Ok(mapped)
    }
}

/// 按 `(sigla, grupo)` 区分新科目与已有科目
///
/// 同一文档内重复出现的行只保留第一次
pub fn split_new_subjects(
    subjects: &[SubjectRecord],
    accepted: &[SubjectKey],
) -> (Vec<SubjectRecord>, Vec<SubjectRecord>) {
    let accepted: HashSet<&SubjectKey> = accepted.iter().collect();
    let mut seen = HashSet::new();
    subjects
        .iter()
        .filter(|s| seen.insert(s.key()))
        .cloned()
        .partition(|s| !accepted.contains(&s.key()))
}

fn terminal(error: ValidationError, summary: ValidationSummary) -> ValidationOutcome {
    ValidationOutcome {
        errors: vec![error.to_string()],
        summary,
        mapped_subjects: Vec::new(),
        failure: Some(FailureKind::from(&error)),
    }
}
