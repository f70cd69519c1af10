//! Embedding Batcher.
//!
//! Splits the ingestion texts into fixed-size chunks and embeds them one
//! chunk at a time. A failing chunk is retried with exponential backoff;
//! once the attempts are used up the whole run fails so the index never
//! ends up with missing vectors. Chunks are never submitted concurrently.

use std::sync::Arc;
use std::time::Duration;

use super::provider::EmbeddingService;
use crate::core::config::EmbeddingTuning;
use crate::core::errors::{with_timeout, EmbeddingServiceError};
use crate::ingest::CancellationToken;

#[derive(Debug, Clone)]
pub struct BatcherConfig {
    pub chunk_size: usize,
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub inter_chunk_pause: Duration,
    pub request_timeout: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self::from(&EmbeddingTuning::default())
    }
}

impl From<&EmbeddingTuning> for BatcherConfig {
    fn from(tuning: &EmbeddingTuning) -> Self {
        Self {
            chunk_size: tuning.chunk_size.max(1),
            max_attempts: tuning.max_attempts.max(1),
            initial_backoff: tuning.initial_backoff(),
            inter_chunk_pause: tuning.inter_chunk_pause(),
            request_timeout: tuning.request_timeout(),
        }
    }
}

#[derive(Clone)]
pub struct EmbeddingBatcher {
    service: Arc<dyn EmbeddingService>,
    config: BatcherConfig,
}

impl EmbeddingBatcher {
    pub fn new(service: Arc<dyn EmbeddingService>, config: BatcherConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Embeds `texts`, preserving length and order.
    ///
    /// Empty input is an error: callers zip the result with their records.
    pub async fn embed_batch(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
        if texts.is_empty() {
            return Err(EmbeddingServiceError::EmptyInput);
        }

        let chunk_size = self.config.chunk_size.max(1);
        let total_chunks = texts.len().div_ceil(chunk_size);
        let mut vectors = Vec::with_capacity(texts.len());

        for (chunk_index, chunk) in texts.chunks(chunk_size).enumerate() {
            let offset = chunk_index * chunk_size;
            if chunk_index > 0 && !cancel.sleep(self.config.inter_chunk_pause).await {
                return Err(EmbeddingServiceError::Cancelled { completed: offset });
            }
            if cancel.is_cancelled() {
                return Err(EmbeddingServiceError::Cancelled { completed: offset });
            }

            tracing::info!(
                "Embedding batch {}/{} ({} texts)",
                chunk_index + 1,
                total_chunks,
                chunk.len()
            );
            let embedded = self.embed_chunk(offset, chunk, cancel).await?;
            vectors.extend(embedded);
        }

        Ok(vectors)
    }

    async fn embed_chunk(
        &self,
        offset: usize,
        chunk: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>, EmbeddingServiceError> {
        let mut delay = self.config.initial_backoff;
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match with_timeout(self.config.request_timeout, self.service.embed(chunk)).await {
                Ok(embedded) => {
                    if embedded.len() != chunk.len() {
                        return Err(EmbeddingServiceError::CountMismatch {
                            offset,
                            expected: chunk.len(),
                            got: embedded.len(),
                        });
                    }
                    return Ok(embedded);
                }
                Err(err) if attempt < self.config.max_attempts => {
                    tracing::warn!(
                        "Embedding chunk at offset {} failed: {}. Retrying in {:?} (attempt {}/{})",
                        offset,
                        err,
                        delay,
                        attempt,
                        self.config.max_attempts
                    );
                    if !cancel.sleep(delay).await {
                        return Err(EmbeddingServiceError::Cancelled { completed: offset });
                    }
                    delay *= 2;
                }
                Err(err) => {
                    tracing::error!(
                        "Embedding chunk at offset {} failed after {} attempts: {}",
                        offset,
                        attempt,
                        err
                    );
                    return Err(EmbeddingServiceError::Exhausted {
                        offset,
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }
}
