//! 成绩单解析
//!
//! 注册号、姓名、科目三个关注点各自是一组有序的纯函数策略，
//! 第一个返回 `Some` 的策略胜出

pub mod normalize;
pub mod registration;
pub mod student_name;
pub mod subjects;

use tracing::debug;

use crate::models::ParsedDocument;
use crate::utils::logging::truncate_text;

/// 按顺序尝试策略，返回第一个成功的结果
pub(crate) fn first_match<T>(strategies: &[fn(&str) -> Option<T>], text: &str) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(text))
}

/// 解析 OCR 文本
pub fn parse(text: &str) -> ParsedDocument {
    debug!("解析文本 ({} 字符): {}", text.chars().count(), truncate_text(text, 200));

    let registration_number = registration::extract(text);
    let student_name = student_name::extract(text);
    let subjects = subjects::extract(text);

    debug!(
        "解析结果: 注册号={:?} 姓名={:?} 科目数={}",
        registration_number,
        student_name,
        subjects.len()
    );

    ParsedDocument::new(registration_number, student_name, subjects)
}
