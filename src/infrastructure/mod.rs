//! 基础设施层
//!
//! - `hasher`：文档指纹
//! - `store`：外部存储能力（trait）
//! - `memory_store`：内存版存储
//! - `resources`：进程资源采样

pub mod hasher;
pub mod memory_store;
pub mod resources;
pub mod store;

pub use memory_store::{GroupLink, InMemoryStore, LinkStatus};
pub use store::{DocumentRecord, EnrollmentStore, OfferingLookup, Submission, TermId};
