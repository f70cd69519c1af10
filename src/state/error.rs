use thiserror::Error;

use crate::core::errors::{ConfigError, IngestionError, ServiceError};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to prepare data directory {path}: {message}")]
    DataDir { path: String, message: String },

    #[error("Failed to open product store: {0}")]
    Store(#[source] IngestionError),

    #[error("Failed to open vector index: {0}")]
    Index(#[source] ServiceError),
}
