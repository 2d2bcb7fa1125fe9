//! 内存版报名数据存储
//!
//! 压测与测试使用，数据来自种子文件或构建方法

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppResult, StoreError};
use crate::infrastructure::store::{
    DocumentRecord, EnrollmentStore, OfferingLookup, Submission, TermId,
};
use crate::models::loaders::SeedCatalog;
use crate::models::{DocumentFingerprint, DocumentStatus, SubjectKey};

/// 文档与开课之间的群组关联状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// 等待加入群组
    Pending,
    /// 已加入群组
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLink {
    pub offering_id: u64,
    pub status: LinkStatus,
}

#[derive(Debug, Clone)]
struct Offering {
    id: u64,
    term: TermId,
    sigla: String,
    grupo: String,
    group_jid: Option<String>,
    active: bool,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub registration_number: String,
    pub name: String,
    /// 已登记的科目计数
    pub registered_subjects: usize,
    accepted: Vec<SubjectKey>,
}

#[derive(Debug, Default)]
struct StoreState {
    active_term: Option<TermId>,
    subjects: HashMap<String, String>,
    sections: HashSet<String>,
    offerings: Vec<Offering>,
    students: HashMap<String, StudentRecord>,
    documents: HashMap<String, DocumentRecord>,
    links: HashMap<u64, Vec<GroupLink>>,
    next_document_id: u64,
}

/// 基于 `RwLock` 的内存存储
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从种子数据构建
    pub fn from_seed(seed: SeedCatalog) -> Self {
        let mut store = Self::new();
        if let Some(term) = seed.terms.iter().find(|t| t.active) {
            store = store.with_active_term(&term.id);
        }
        for subject in seed.subjects {
            store = store.with_subject(&subject.code, &subject.name);
        }
        for section in seed.sections {
            store = store.with_section(&section);
        }
        for offering in seed.offerings {
            let state = store.state.get_mut();
            state.offerings.push(Offering {
                id: offering.id,
                term: offering.term,
                sigla: offering.sigla,
                grupo: offering.grupo,
                group_jid: offering.group_jid,
                active: offering.active,
            });
        }
        for student in seed.students {
            store = store.with_student(
                &student.identity,
                &student.registration_number,
                &student.name,
                student.accepted,
            );
        }
        for document in seed.documents {
            store = store.with_document(
                &document.fingerprint,
                document.identity.as_deref(),
                document.status,
                document.uploaded_at,
            );
        }
        store
    }

    pub fn with_active_term(mut self, term: &str) -> Self {
        self.state.get_mut().active_term = Some(term.to_string());
        self
    }

    pub fn with_subject(mut self, code: &str, name: &str) -> Self {
        self.state
            .get_mut()
            .subjects
            .insert(code.to_string(), name.to_string());
        self
    }

    pub fn with_section(mut self, code: &str) -> Self {
        self.state.get_mut().sections.insert(code.to_string());
        self
    }

    /// 登记一个开课，`group_jid` 为 None 表示群组未配置
    pub fn with_offering(
        mut self,
        id: u64,
        term: &str,
        sigla: &str,
        grupo: &str,
        group_jid: Option<&str>,
    ) -> Self {
        self.state.get_mut().offerings.push(Offering {
            id,
            term: term.to_string(),
            sigla: sigla.to_string(),
            grupo: grupo.to_string(),
            group_jid: group_jid.map(str::to_string),
            active: true,
        });
        self
    }

    pub fn with_student(
        mut self,
        identity: &str,
        registration_number: &str,
        name: &str,
        accepted: Vec<SubjectKey>,
    ) -> Self {
        self.state.get_mut().students.insert(
            identity.to_string(),
            StudentRecord {
                registration_number: registration_number.to_string(),
                name: name.to_string(),
                registered_subjects: accepted.len(),
                accepted,
            },
        );
        self
    }

    pub fn with_document(
        mut self,
        fingerprint: &str,
        identity: Option<&str>,
        status: DocumentStatus,
        uploaded_at: chrono::DateTime<Utc>,
    ) -> Self {
        let state = self.state.get_mut();
        state.next_document_id += 1;
        let record = DocumentRecord {
            id: state.next_document_id,
            fingerprint: fingerprint.to_string(),
            identity: identity.map(str::to_string),
            status,
            uploaded_at,
        };
        state.documents.insert(fingerprint.to_string(), record);
        self
    }

    pub async fn document_count(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn student(&self, identity: &str) -> Option<StudentRecord> {
        self.state.read().await.students.get(identity).cloned()
    }

    /// 某文档当前的群组关联
    pub async fn links_for(&self, fingerprint: &DocumentFingerprint) -> Vec<GroupLink> {
        let state = self.state.read().await;
        state
            .documents
            .get(fingerprint.as_str())
            .and_then(|doc| state.links.get(&doc.id))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryStore {
    async fn find_document_by_fingerprint(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> AppResult<Option<DocumentRecord>> {
        let state = self.state.read().await;
        Ok(state.documents.get(fingerprint.as_str()).cloned())
    }

    async fn identity_registration(&self, identity: &str) -> AppResult<Option<String>> {
        let state = self.state.read().await;
        Ok(state
            .students
            .get(identity)
            .map(|s| s.registration_number.clone()))
    }

    async fn find_pending_document(
        &self,
        identity: &str,
        statuses: &[DocumentStatus],
    ) -> AppResult<Option<DocumentRecord>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .values()
            .filter(|doc| doc.identity.as_deref() == Some(identity))
            .filter(|doc| statuses.contains(&doc.status))
            .max_by_key(|doc| doc.uploaded_at)
            .cloned())
    }

    async fn accepted_subjects(&self, identity: &str) -> AppResult<Vec<SubjectKey>> {
        let state = self.state.read().await;
        let mut keys: Vec<SubjectKey> = state
            .students
            .get(identity)
            .map(|s| s.accepted.clone())
            .unwrap_or_default();

        // 已加入群组的关联同样计入
        for doc in state
            .documents
            .values()
            .filter(|doc| doc.identity.as_deref() == Some(identity))
        {
            for link in state.links.get(&doc.id).into_iter().flatten() {
                if link.status != LinkStatus::Added {
                    continue;
                }
                if let Some(offering) = state.offerings.iter().find(|o| o.id == link.offering_id) {
                    keys.push(SubjectKey::new(&offering.sigla, &offering.grupo));
                }
            }
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn resolve_offering(&self, term: &str, sigla: &str, grupo: &str) -> AppResult<OfferingLookup> {
        let state = self.state.read().await;

        let Some(subject_name) = state.subjects.get(sigla) else {
            return Ok(OfferingLookup::UnknownSubject);
        };
        if !state.sections.contains(grupo) {
            return Ok(OfferingLookup::UnknownSection);
        }

        let offering = state
            .offerings
            .iter()
            .find(|o| o.active && o.term == term && o.sigla == sigla && o.grupo == grupo);

        Ok(match offering {
            Some(o) => OfferingLookup::Resolved {
                id: o.id,
                subject_name: subject_name.clone(),
                group_jid: o.group_jid.clone(),
            },
            None => OfferingLookup::NotOffered,
        })
    }

    async fn active_term(&self) -> AppResult<Option<TermId>> {
        Ok(self.state.read().await.active_term.clone())
    }

    async fn persist(&self, submission: &Submission) -> AppResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if state.active_term.is_none() {
            return Err(StoreError::NoActiveTerm.into());
        }

        // 文档：按指纹 upsert
        let fingerprint = submission.fingerprint.as_str().to_string();
        let document_id = match state.documents.get_mut(&fingerprint) {
            Some(existing) => {
                existing.identity = Some(submission.identity.clone());
                existing.status = DocumentStatus::Completed;
                existing.id
            }
            None => {
                state.next_document_id += 1;
                let id = state.next_document_id;
                state.documents.insert(
                    fingerprint.clone(),
                    DocumentRecord {
                        id,
                        fingerprint: fingerprint.clone(),
                        identity: Some(submission.identity.clone()),
                        status: DocumentStatus::Completed,
                        uploaded_at: Utc::now(),
                    },
                );
                id
            }
        };

        let linked: Vec<GroupLink> = submission
            .mapped_subjects
            .iter()
            .filter(|s| s.can_add)
            .filter_map(|s| s.group_materia_id)
            .map(|offering_id| GroupLink {
                offering_id,
                status: LinkStatus::Pending,
            })
            .collect();
        // 同一指纹重复持久化时，替换而不是累加该文档的计数
        let previous_count = state.links.get(&document_id).map_or(0, Vec::len);

        // 学生：按身份 upsert
        let student = state
            .students
            .entry(submission.identity.clone())
            .or_insert_with(|| StudentRecord {
                registration_number: submission.registration_number.clone(),
                name: submission.student_name.clone(),
                registered_subjects: 0,
                accepted: Vec::new(),
            });
        student.registration_number = submission.registration_number.clone();
        student.name = submission.student_name.clone();
        student.registered_subjects =
            student.registered_subjects.saturating_sub(previous_count) + linked.len();

        debug!(
            "持久化文档 {} ({} 个群组关联)",
            &fingerprint[..fingerprint.len().min(12)],
            linked.len()
        );
        state.links.insert(document_id, linked);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::hasher;
    use crate::models::{MappedSubject, ParsedDocument, SubjectRecord};

    fn catalog() -> InMemoryStore {
        InMemoryStore::new()
            .with_active_term("2025-1")
            .with_subject("INF412", "PROGRAMACION III")
            .with_subject("MAT101", "CALCULO I")
            .with_section("SA")
            .with_section("Z1")
            .with_offering(1, "2025-1", "INF412", "SA", Some("111@g.us"))
            .with_offering(2, "2025-1", "MAT101", "Z1", None)
    }

    #[tokio::test]
    async fn resolves_offerings_by_term_subject_and_section() {
        let store = catalog();
        assert_eq!(
            store.resolve_offering("2025-1", "INF412", "SA").await.unwrap(),
            OfferingLookup::Resolved {
                id: 1,
                subject_name: "PROGRAMACION III".into(),
                group_jid: Some("111@g.us".into()),
            }
        );
        assert_eq!(
            store.resolve_offering("2025-1", "FIS100", "SA").await.unwrap(),
            OfferingLookup::UnknownSubject
        );
        assert_eq!(
            store.resolve_offering("2025-1", "INF412", "X9").await.unwrap(),
            OfferingLookup::UnknownSection
        );
        assert_eq!(
            store.resolve_offering("2024-2", "INF412", "SA").await.unwrap(),
            OfferingLookup::NotOffered
        );
    }

    #[tokio::test]
    async fn pending_lookup_returns_latest_matching_status() {
        let earlier = Utc::now() - chrono::Duration::days(2);
        let later = Utc::now() - chrono::Duration::days(1);
        let store = InMemoryStore::new()
            .with_document("a", Some("id"), DocumentStatus::Completed, later)
            .with_document("b", Some("id"), DocumentStatus::Pending, earlier)
            .with_document("c", Some("other"), DocumentStatus::Processing, later);

        let found = store
            .find_pending_document("id", &DocumentStatus::UNRESOLVED)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.fingerprint, "b");
    }

    #[tokio::test]
    async fn persist_upserts_student_document_and_links() {
        let store = catalog();
        let fingerprint = hasher::fingerprint(b"doc");
        let subject = SubjectRecord::new("INF412", "SA", "PROGRAMACION III");
        let submission = Submission {
            identity: "test_1@c.us".into(),
            registration_number: "223456789".into(),
            student_name: "JUAN PEREZ".into(),
            fingerprint: fingerprint.clone(),
            parsed: ParsedDocument::new(Some("223456789".into()), Some("JUAN PEREZ".into()), vec![subject.clone()]),
            mapped_subjects: vec![
                MappedSubject {
                    subject: subject.clone(),
                    can_add: true,
                    reason: None,
                    group_materia_id: Some(1),
                    group_jid: Some("111@g.us".into()),
                },
                MappedSubject::rejected(SubjectRecord::new("MAT101", "Z1", "CALCULO I"), "WhatsApp group not configured"),
            ],
        };

        store.persist(&submission).await.unwrap();
        store.persist(&submission).await.unwrap();

        assert_eq!(store.document_count().await, 1);
        let doc = store.find_document_by_fingerprint(&fingerprint).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(
            store.links_for(&fingerprint).await,
            vec![GroupLink { offering_id: 1, status: LinkStatus::Pending }]
        );
        let student = store.student("test_1@c.us").await.unwrap();
        assert_eq!(student.registration_number, "223456789");
        assert_eq!(student.registered_subjects, 1);
    }

    #[tokio::test]
    async fn persist_requires_active_term() {
        let store = InMemoryStore::new();
        let submission = Submission {
            identity: "x".into(),
            registration_number: "1".into(),
            student_name: "n".into(),
            fingerprint: hasher::fingerprint(b"x"),
            parsed: ParsedDocument::default(),
            mapped_subjects: vec![],
        };
        let err = store.persist(&submission).await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Store(StoreError::NoActiveTerm)));
    }
}
