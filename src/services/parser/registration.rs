use regex::Regex;
use std::sync::LazyLock;

use super::normalize;

static LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:REGISTRO|MATRICULA|MATRÍCULA|REG\.?|MAT\.?)[:\s]*(\d{8,9})")
        .expect("valid regex")
});
static INSTITUTIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(222\d{6})\b").expect("valid regex"));
static NINE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{9})\b").expect("valid regex"));
static EIGHT_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{8})\b").expect("valid regex"));

/// 从最具体到最宽泛
const STRATEGIES: &[fn(&str) -> Option<String>] = &[labelled, institutional, nine_digits, eight_digits];

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn labelled(text: &str) -> Option<String> {
    capture(&LABELLED, text)
}

fn institutional(text: &str) -> Option<String> {
    capture(&INSTITUTIONAL, text)
}

fn nine_digits(text: &str) -> Option<String> {
    capture(&NINE_DIGITS, text)
}

fn eight_digits(text: &str) -> Option<String> {
    capture(&EIGHT_DIGITS, text)
}

/// 提取注册号
pub fn extract(text: &str) -> Option<String> {
    let cleaned = normalize::registration_confusions(text);
    super::first_match(STRATEGIES, &cleaned)
}
