use async_trait::async_trait;

use crate::core::errors::ServiceError;

/// Opaque `embed(texts) -> vectors` service.
///
/// Implementations return exactly one vector per input, in input order.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// return the backend name (e.g. "openai", "hashing")
    fn name(&self) -> &str;

    /// embed a batch of texts
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError>;
}
