use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure of a single outbound call to an opaque service
/// (embedding, completion or vector index).
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ServiceError {
    pub fn request<E: std::fmt::Display>(err: E) -> Self {
        ServiceError::Request(err.to_string())
    }

    pub fn malformed<E: std::fmt::Display>(err: E) -> Self {
        ServiceError::Malformed(err.to_string())
    }
}

/// Races `fut` against `limit`, turning an elapsed deadline into
/// [`ServiceError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ServiceError>
where
    F: std::future::Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(limit)),
    }
}

/// A raw catalog record that cannot be turned into a product.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("record {position} has no name")]
    MissingName { position: usize },
    #[error("record {position} is not a JSON object")]
    NotAnObject { position: usize },
    #[error("duplicate product id {id} (record {position})")]
    DuplicateId { id: String, position: usize },
    #[error("catalog document must be a JSON object or array")]
    UnsupportedDocument,
    #[error("catalog contains no usable records")]
    EmptyCatalog,
    #[error("invalid catalog JSON: {0}")]
    Json(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingServiceError {
    #[error("no texts supplied for embedding")]
    EmptyInput,
    #[error("embedding chunk at offset {offset} failed after {attempts} attempts: {source}")]
    Exhausted {
        offset: usize,
        attempts: usize,
        #[source]
        source: ServiceError,
    },
    #[error("embedding service returned {got} vectors for {expected} texts (chunk offset {offset})")]
    CountMismatch {
        offset: usize,
        expected: usize,
        got: usize,
    },
    #[error("embedding cancelled after {completed} texts")]
    Cancelled { completed: usize },
}

#[derive(Debug, Error)]
pub enum IndexLifecycleError {
    #[error("failed to describe index {name}: {source}")]
    Describe {
        name: String,
        #[source]
        source: ServiceError,
    },
    #[error("failed to create index {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: ServiceError,
    },
    #[error("failed to delete index {name}: {source}")]
    Delete {
        name: String,
        #[source]
        source: ServiceError,
    },
    #[error("index {name} not ready after {waited:?}")]
    NotReady { name: String, waited: Duration },
    #[error("index {name} still present after delete ({waited:?})")]
    NotDeleted { name: String, waited: Duration },
    #[error("index lifecycle for {name} cancelled")]
    Cancelled { name: String },
    #[error("search on index {name} failed: {source}")]
    Search {
        name: String,
        #[source]
        source: ServiceError,
    },
}

/// Run-level failure of the offline ingestion job. Every variant is fatal.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingServiceError),
    #[error(transparent)]
    Index(#[from] IndexLifecycleError),
    #[error("vector for {id} has dimension {got}, index expects {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        got: usize,
    },
    #[error("upsert batch at offset {offset} failed: {source}")]
    UpsertFailed {
        offset: usize,
        #[source]
        source: ServiceError,
    },
    #[error("row store error: {0}")]
    Store(String),
    #[error("failed to read catalog {path}: {message}")]
    Io { path: String, message: String },
    #[error("ingestion cancelled after {upserted} vectors")]
    Cancelled { upserted: usize },
}

/// Structured-query path failure. Recovered by the router through
/// vector-search fallback, never shown to the end user.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("query generation failed: {0}")]
    Generation(String),
    #[error("generated query is empty")]
    EmptyQuery,
    #[error("query execution failed: {0}")]
    Execution(String),
    #[error("query execution timed out after {0:?}")]
    Timeout(Duration),
    #[error("query rejected: {0}")]
    Rejected(String),
}

/// Final synthesis call failed; callers surface this as "try again".
#[derive(Debug, Error)]
#[error("answer generation failed: {source}")]
pub struct GenerationServiceError {
    #[source]
    pub source: ServiceError,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },
    #[error("failed to read {path}: {message}")]
    Unreadable { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<GenerationServiceError> for ApiError {
    fn from(err: GenerationServiceError) -> Self {
        tracing::error!("Answer generation failed: {}", err);
        ApiError::ServiceUnavailable(
            "The assistant could not generate an answer right now. Please try again.".to_string(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, retryable) = match &self {
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone(), true),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), false),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), false),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), false),
        };

        let body = Json(json!({ "error": message, "retryable": retryable }));
        (status, body).into_response()
    }
}
