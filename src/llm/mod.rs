pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

/// One chat turn's worth of input for the completion backend: the
/// flattened history window supplied by the client plus the newest
/// user message.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub history: String,
    pub message: String,
}

/// Every completion-path failure collapses into a single kind. The
/// relay never needs to distinguish a network error from a safety
/// block or a missing credential; it only decides whether to fall
/// back. The detail string exists for logs.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion backend unavailable: {0}")] Unavailable(String),
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}
