//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 装配存储、OCR、流程
//! - 输出报告和失败记录
//!
//! ### `scheduler` - 批量调度器
//! - sequential / parallel / batch 三种模式
//! - 控制并发数量（Semaphore）
//! - 汇总 StressTestReport
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (App)
//!     ↓
//! scheduler (处理 Vec<RawDocument>)
//!     ↓
//! workflow::DocumentFlow (处理单个文档)
//!     ↓
//! services (能力层：ocr / parser / report_writer)
//!     ↓
//! infrastructure (基础设施：hasher / store)
//! ```

pub mod batch_processor;
pub mod scheduler;

// 重新导出主要类型
pub use batch_processor::App;
pub use scheduler::{build_report, concurrency_limit, BatchScheduler, RunOptions};
