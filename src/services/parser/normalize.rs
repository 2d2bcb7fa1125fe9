//! OCR 常见字符混淆的修正

use regex::Regex;
use std::sync::LazyLock;

static O_BEFORE_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Oo](\d)").expect("valid regex"));
static I_BEFORE_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Il](\d)").expect("valid regex"));
static O_BETWEEN_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)[Oo](\d)").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// 注册号修正：数字前的 `O/o` → `0`，`I/l` → `1`
pub fn registration_confusions(text: &str) -> String {
    let text = O_BEFORE_DIGIT.replace_all(text, "0${1}");
    I_BEFORE_DIGIT.replace_all(&text, "1${1}").into_owned()
}

/// 科目修正：两个数字之间的 `O/o` → `0`，数字前的 `I/l` → `1`
///
/// 保留换行，表格匹配依赖行结构
pub fn subject_confusions(text: &str) -> String {
    // 被替换的右侧数字会被消耗，连续出现时需要多轮
    let mut current = text.to_string();
    loop {
        let next = O_BETWEEN_DIGITS.replace_all(&current, "${1}0${2}").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    I_BEFORE_DIGIT.replace_all(&current, "1${1}").into_owned()
}

/// 连续空白压缩为单个空格
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}
