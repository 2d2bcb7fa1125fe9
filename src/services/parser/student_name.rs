//! 学生姓名提取
//!
//! 依次尝试五种策略，候选命中表头词汇时丢弃并继续下一种

use regex::Regex;
use std::sync::LazyLock;

static AFTER_REGISTRATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\d{8,9}\s+([A-ZÑÁÉÍÓÚÜa-zñáéíóúü\s]{10,}?)(?:\s+(?:CARRERA|INGENIERIA|INGENIERÍA|ING\.|LICENCIATURA|ORIGEN|\d{7}-[A-Z]{3}))",
    )
    .expect("valid regex")
});
static TABLE_ROWS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|\s*\d{8,9}\s*\|\s*\|\s*([A-ZÑÁÉÍÓÚÜa-zñáéíóúü\s]+?)\s+\d{5,}-[A-Z]{2,4}\s*\|")
        .expect("valid regex")
});
static BEFORE_ID_CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([A-ZÑÁÉÍÓÚÜa-zñáéíóúü]{3,}(?:\s+[A-ZÑÁÉÍÓÚÜa-zñáéíóúü]{3,}){1,4})\s+\d{5,}-[A-Z]{2,4}",
    )
    .expect("valid regex")
});
static REGISTRATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8,9}").expect("valid regex"));
static NAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-ZÑÁÉÍÓÚÜa-zñáéíóúü\s]{10,}$").expect("valid regex")
});
static CAPITALIZED_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-ZÑÁÉÍÓÚ]{3,}\s+[A-ZÑÁÉÍÓÚ]{3,}(?:\s+[A-ZÑÁÉÍÓÚ]{3,})?)\b")
        .expect("valid regex")
});

static HEADER_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)PERIODO|NORMAL|MODALIDAD|LOCALIDAD").expect("valid regex"));
static HEADER_WORDS_WITH_ORIGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)PERIODO|NORMAL|MODALIDAD|LOCALIDAD|ORIGEN").expect("valid regex")
});
static HEADER_WORDS_WITH_CAREER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)PERIODO|NORMAL|MODALIDAD|LOCALIDAD|ORIGEN|INGENIERIA|INFORMATICA")
        .expect("valid regex")
});

const STRATEGIES: &[fn(&str) -> Option<String>] = &[
    after_registration,
    table_rows,
    before_id_card,
    line_after_registration,
    capitalized_words,
];

fn first_group(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// 注册号之后、第一个专业关键字之前
fn after_registration(text: &str) -> Option<String> {
    first_group(&AFTER_REGISTRATION, text).filter(|name| !HEADER_WORDS.is_match(name))
}

/// 两行表格：`| 248112233 |` 下一行 `| Nombre 5192837-SCZ |`
fn table_rows(text: &str) -> Option<String> {
    first_group(&TABLE_ROWS, text).filter(|name| !name.is_empty())
}

/// 紧邻证件号（`5192837-SCZ`）之前
fn before_id_card(text: &str) -> Option<String> {
    first_group(&BEFORE_ID_CARD, text).filter(|name| !HEADER_WORDS_WITH_CAREER.is_match(name))
}

/// 含注册号那一行的下一行
fn line_after_registration(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    lines.windows(2).find_map(|pair| {
        if !REGISTRATION_LINE.is_match(pair[0]) {
            return None;
        }
        let next = pair[1].trim();
        let acceptable = NAME_LINE.is_match(next)
            && !next.chars().any(|c| c.is_ascii_digit())
            && !HEADER_WORDS_WITH_ORIGIN.is_match(next);
        acceptable.then(|| next.to_string())
    })
}

/// 兜底：两到三个连续的大写单词
fn capitalized_words(text: &str) -> Option<String> {
    first_group(&CAPITALIZED_WORDS, text).filter(|name| !HEADER_WORDS.is_match(name))
}

/// 提取学生姓名
pub fn extract(text: &str) -> Option<String> {
    super::first_match(STRATEGIES, text)
}
