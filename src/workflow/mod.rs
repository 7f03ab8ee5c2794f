pub mod block_ctx;
pub mod extract_flow;

pub use block_ctx::BlockCtx;
pub use extract_flow::ExtractFlow;
