use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::ProductMetadata;
use crate::core::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Cosine,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescriptor {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
}

impl IndexDescriptor {
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: DistanceMetric::Cosine,
        }
    }
}

/// What the backing service reports about an existing index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescription {
    pub descriptor: IndexDescriptor,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorItem {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ProductMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    pub metadata: ProductMetadata,
}

/// Opaque vector index service: create/delete/describe/upsert/query by name.
#[async_trait]
pub trait VectorIndexService: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when no index with this name exists.
    async fn describe(&self, index: &str) -> Result<Option<IndexDescription>, ServiceError>;

    async fn create(&self, descriptor: &IndexDescriptor) -> Result<(), ServiceError>;

    async fn delete(&self, index: &str) -> Result<(), ServiceError>;

    /// Insert or overwrite by id.
    async fn upsert(&self, index: &str, items: &[VectorItem]) -> Result<(), ServiceError>;

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, ServiceError>;

    async fn count(&self, index: &str) -> Result<usize, ServiceError>;
}
