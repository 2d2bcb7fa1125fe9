//! 业务能力层
//!
//! - `ocr`：文本提取（provider 降级链）
//! - `parser`：成绩单解析
//! - `report_writer`：报告与失败记录输出

pub mod ocr;
pub mod parser;
pub mod report_writer;

pub use ocr::{OcrOrchestrator, OcrProvider};
pub use report_writer::ReportWriter;
