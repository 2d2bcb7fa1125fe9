pub mod document_ctx;
pub mod document_flow;
pub mod validation_chain;

pub use document_ctx::DocumentCtx;
pub use document_flow::{DocumentFlow, FlowOptions};
pub use validation_chain::ValidationChain;
