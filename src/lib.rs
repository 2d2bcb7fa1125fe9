//! # Enrollment Pipeline
//!
//! 成绩单（选课回执）批量处理与压测工具
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 指纹、存储能力（trait）、内存存储、资源采样
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文档
//! - `OcrOrchestrator` - OCR provider 降级链
//! - `parser` - 注册号 / 姓名 / 科目提取
//! - `ReportWriter` - 报告与失败记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份文档"的完整处理流程
//! - `ValidationChain` - 有序业务校验
//! - `DocumentFlow` - 指纹 → OCR → 解析 → 校验 → 持久化
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/scheduler` - 三种模式的批量调度与报告汇总
//! - `orchestrator/batch_processor` - 应用入口，管理资源

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{EnrollmentStore, InMemoryStore};
pub use models::{ProcessMode, ProcessingResult, RawDocument, StressTestReport};
pub use orchestrator::{App, BatchScheduler};
pub use services::{OcrOrchestrator, OcrProvider};
pub use workflow::{DocumentCtx, DocumentFlow, FlowOptions, ValidationChain};
