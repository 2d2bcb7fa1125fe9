use serde::{Deserialize, Serialize};

/// 成绩单中的一行科目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    /// 科目代码（3 字母 + 3 数字）
    pub sigla: String,
    /// 班组代码（1 字母 + 1 字母或数字）
    pub grupo: String,
    /// 科目名称
    pub materia: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalidad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nivel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horario: Option<String>,
}

impl SubjectRecord {
    pub fn new(sigla: impl Into<String>, grupo: impl Into<String>, materia: impl Into<String>) -> Self {
        Self {
            sigla: sigla.into(),
            grupo: grupo.into(),
            materia: materia.into(),
            modalidad: None,
            nivel: None,
            horario: None,
        }
    }

    /// 去重与配额只看 (sigla, grupo)
    pub fn key(&self) -> SubjectKey {
        SubjectKey::new(&self.sigla, &self.grupo)
    }
}

/// 科目身份键 `(sigla, grupo)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectKey {
    pub sigla: String,
    pub grupo: String,
}

impl SubjectKey {
    pub fn new(sigla: impl Into<String>, grupo: impl Into<String>) -> Self {
        Self {
            sigla: sigla.into(),
            grupo: grupo.into(),
        }
    }
}

impl std::fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.sigla, self.grupo)
    }
}

/// 解析后的成绩单
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub is_valid: bool,
    pub registration_number: Option<String>,
    pub student_name: Option<String>,
    pub subjects: Vec<SubjectRecord>,
}

impl ParsedDocument {
    pub fn new(
        registration_number: Option<String>,
        student_name: Option<String>,
        subjects: Vec<SubjectRecord>,
    ) -> Self {
        let is_valid =
            registration_number.is_some() && student_name.is_some() && !subjects.is_empty();
        Self {
            is_valid,
            registration_number,
            student_name,
            subjects,
        }
    }
}

/// 映射到消息群组后的科目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedSubject {
    #[serde(flatten)]
    pub subject: SubjectRecord,
    pub can_add: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_materia_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_jid: Option<String>,
}

impl MappedSubject {
    pub fn rejected(subject: SubjectRecord, reason: impl Into<String>) -> Self {
        Self {
            subject,
            can_add: false,
            reason: Some(reason.into()),
            group_materia_id: None,
            group_jid: None,
        }
    }
}
