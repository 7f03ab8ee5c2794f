pub mod llm_client;
pub mod storage_client;

pub use llm_client::{CompletionRequest, CompletionService, ImagePart, LlmClient};
pub use storage_client::StorageClient;
