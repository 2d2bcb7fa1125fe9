//! 科目表提取
//!
//! 三种匹配器按顺序尝试，第一个得到结果的匹配器直接胜出，结果不合并

use regex::Regex;
use std::sync::LazyLock;

use super::normalize;
use crate::models::SubjectRecord;

/// 宽松匹配找不到名称时的占位
pub const UNKNOWN_SUBJECT: &str = "MATERIA DESCONOCIDA";

const CONTEXT_WINDOW: usize = 200;
const RELAXED_NAME_WINDOW: usize = 80;

static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\|\s*([A-Z]{3}\d{3})\s*\|\s*([A-Z][A-Z0-9])\s*\|\s*([A-ZÑÁÉÍÓÚÜ\s.0-9&]{5,}?)\s*\|")
        .expect("valid regex")
});
// 行以模式/级别/星期或文本结尾终止；星期区分大小写，避免罗马数字被误判
static PLAIN_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:\b([A-Z]{3}\d{3})\s+([A-Z][A-Z0-9])\s+([A-ZÑÁÉÍÓÚÜ\s.&]{5,}?))(?:\s+(?:(?i:PRESENCIAL|VIRTUAL|HIBRIDA)|\d+|Lu|Ma|Mi|Ju|Vi|Sa|Do)\b|\s*$)",
    )
    .expect("valid regex")
});
static MODALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(PRESENCIAL|VIRTUAL|HIBRIDA)\b").expect("valid regex")
});
static LEVEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\b").expect("valid regex"));
static SCHEDULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}\s*-\s*\d{1,2}:\d{2})").expect("valid regex")
});
static RELAXED_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Z]{3})\s*(\d{3})\s+([A-Z][A-Z0-9])\b").expect("valid regex")
});
static RELAXED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\s+([A-ZÑÁÉÍÓÚÜ\s.&]{10,}?)(?:\s+(?:(?:PRESENCIAL|VIRTUAL|Ma|Lu|Mi|Ju|Vi)\b|\|)|\s*$)",
    )
    .expect("valid regex")
});

const STRATEGIES: &[fn(&str) -> Option<Vec<SubjectRecord>>] = &[pipe_table, plain_text, relaxed];

fn non_empty(subjects: Vec<SubjectRecord>) -> Option<Vec<SubjectRecord>> {
    (!subjects.is_empty()).then_some(subjects)
}

fn clean_name(raw: &str) -> String {
    normalize::collapse_whitespace(raw.trim())
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `| INF412 | SA | PROGRAMACION III |`
fn pipe_table(text: &str) -> Option<Vec<SubjectRecord>> {
    let subjects = TABLE_ROW
        .captures_iter(text)
        .map(|caps| {
            SubjectRecord::new(
                caps[1].trim().to_uppercase(),
                caps[2].trim().to_uppercase(),
                clean_name(&caps[3]),
            )
        })
        .collect();
    non_empty(subjects)
}

/// `INF412 SA SISTEMAS OPERATIVOS PRESENCIAL 1 Lu 08:00-10:00`
fn plain_text(text: &str) -> Option<Vec<SubjectRecord>> {
    let collapsed = normalize::collapse_whitespace(text);
    let subjects = PLAIN_ROW
        .captures_iter(&collapsed)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let context: String = collapsed[whole.start()..]
                .chars()
                .take(CONTEXT_WINDOW)
                .collect();

            let mut subject = SubjectRecord::new(
                caps[1].to_uppercase(),
                caps[2].to_uppercase(),
                clean_name(&caps[3]),
            );
            subject.modalidad = capture(&MODALITY, &context);
            subject.nivel = capture(&LEVEL, &context);
            subject.horario = capture(&SCHEDULE, &context);
            Some(subject)
        })
        .collect();
    non_empty(subjects)
}

/// 允许代码中间有空格：`INF 412 SA`
fn relaxed(text: &str) -> Option<Vec<SubjectRecord>> {
    let subjects = RELAXED_ROW
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let window: String = text[whole.end()..]
                .chars()
                .take(RELAXED_NAME_WINDOW)
                .collect();
            let materia = capture(&RELAXED_NAME, &window)
                .map(|name| clean_name(&name))
                .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string());

            Some(SubjectRecord::new(
                format!("{}{}", &caps[1], &caps[2]).to_uppercase(),
                caps[3].to_uppercase(),
                materia,
            ))
        })
        .collect();
    non_empty(subjects)
}

/// 提取科目列表
pub fn extract(text: &str) -> Vec<SubjectRecord> {
    let normalized = normalize::subject_confusions(text);
    super::first_match(STRATEGIES, &normalized).unwrap_or_default()
}
