//! Embedding services and the ingestion-time batcher.

mod batcher;
mod hashing;
mod openai;
mod provider;

pub use batcher::{BatcherConfig, EmbeddingBatcher};
pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbedder;
pub use provider::EmbeddingService;
