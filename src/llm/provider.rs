use async_trait::async_trait;

use super::types::CompletionRequest;
use crate::core::errors::ServiceError;

/// Opaque `complete(systemPrompt, userPrompt) -> text` service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError>;
}
