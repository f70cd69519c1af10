//! Vector Index Manager.
//!
//! Owns the lifecycle of one named similarity index on top of whichever
//! [`VectorIndexService`] backend is configured. Holds no mutable state,
//! so one instance is shared freely between queries.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::service::{IndexDescriptor, QueryMatch, VectorIndexService, VectorItem};
use crate::core::config::IndexTuning;
use crate::core::errors::{with_timeout, IndexLifecycleError, IngestionError};
use crate::ingest::CancellationToken;

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub upsert_batch_size: usize,
    pub readiness_poll: Duration,
    pub readiness_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self::from(&IndexTuning::default())
    }
}

impl From<&IndexTuning> for IndexSettings {
    fn from(tuning: &IndexTuning) -> Self {
        Self {
            upsert_batch_size: tuning.upsert_batch_size.max(1),
            readiness_poll: tuning.readiness_poll(),
            readiness_timeout: tuning.readiness_timeout(),
            request_timeout: tuning.request_timeout(),
        }
    }
}

/// What `ensure_index` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    Created,
    Reused,
    Recreated,
}

#[derive(Clone)]
pub struct VectorIndexManager {
    service: Arc<dyn VectorIndexService>,
    settings: IndexSettings,
}

impl VectorIndexManager {
    pub fn new(service: Arc<dyn VectorIndexService>, settings: IndexSettings) -> Self {
        Self { service, settings }
    }

    pub fn backend(&self) -> &str {
        self.service.name()
    }

    /// Reuses `name` when it already has `dimension`, otherwise destroys and
    /// rebuilds it. Returns once the backend reports the index ready.
    pub async fn ensure_index(
        &self,
        name: &str,
        dimension: usize,
        cancel: &CancellationToken,
    ) -> Result<IndexOutcome, IndexLifecycleError> {
        let existing = self.describe(name).await?;

        let outcome = match existing {
            Some(found) if found.descriptor.dimension == dimension => {
                tracing::info!(
                    "Reusing index {} (dimension {})",
                    name,
                    found.descriptor.dimension
                );
                if !found.ready {
                    self.wait_until_ready(name, cancel).await?;
                }
                return Ok(IndexOutcome::Reused);
            }
            Some(found) => {
                tracing::info!(
                    "Index {} has dimension {}, expected {}; recreating",
                    name,
                    found.descriptor.dimension,
                    dimension
                );
                self.delete_and_wait(name, cancel).await?;
                IndexOutcome::Recreated
            }
            None => IndexOutcome::Created,
        };

        self.create_and_wait(name, dimension, cancel).await?;
        Ok(outcome)
    }

    /// Unconditional destroy-and-rebuild.
    pub async fn recreate_index(
        &self,
        name: &str,
        dimension: usize,
        cancel: &CancellationToken,
    ) -> Result<IndexOutcome, IndexLifecycleError> {
        let outcome = if self.describe(name).await?.is_some() {
            tracing::info!("Deleting existing index: {}", name);
            self.delete_and_wait(name, cancel).await?;
            IndexOutcome::Recreated
        } else {
            IndexOutcome::Created
        };
        self.create_and_wait(name, dimension, cancel).await?;
        Ok(outcome)
    }

    /// Writes `items` in fixed-size batches. Cancellation is only honoured
    /// between batches, never inside one.
    pub async fn upsert(
        &self,
        name: &str,
        items: &[VectorItem],
        cancel: &CancellationToken,
    ) -> Result<usize, IngestionError> {
        let batch_size = self.settings.upsert_batch_size.max(1);
        let total_batches = items.len().div_ceil(batch_size);
        let mut upserted = 0usize;

        for (batch_index, batch) in items.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                return Err(IngestionError::Cancelled { upserted });
            }
            let offset = batch_index * batch_size;
            with_timeout(
                self.settings.request_timeout,
                self.service.upsert(name, batch),
            )
            .await
            .map_err(|source| IngestionError::UpsertFailed { offset, source })?;

            upserted += batch.len();
            tracing::info!("Inserted batch {}/{}", batch_index + 1, total_batches);
        }

        Ok(upserted)
    }

    /// Read-only similarity search. An empty index yields an empty result.
    pub async fn search(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, IndexLifecycleError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let matches = with_timeout(
            self.settings.request_timeout,
            self.service.query(name, vector, top_k),
        )
        .await
        .map_err(|source| IndexLifecycleError::Search {
            name: name.to_string(),
            source,
        })?;
        Ok(super::rank_matches(matches, top_k))
    }

    pub async fn count(&self, name: &str) -> Result<usize, IndexLifecycleError> {
        with_timeout(self.settings.request_timeout, self.service.count(name))
            .await
            .map_err(|source| IndexLifecycleError::Describe {
                name: name.to_string(),
                source,
            })
    }

    async fn describe(
        &self,
        name: &str,
    ) -> Result<Option<super::IndexDescription>, IndexLifecycleError> {
        with_timeout(self.settings.request_timeout, self.service.describe(name))
            .await
            .map_err(|source| IndexLifecycleError::Describe {
                name: name.to_string(),
                source,
            })
    }

    async fn create_and_wait(
        &self,
        name: &str,
        dimension: usize,
        cancel: &CancellationToken,
    ) -> Result<(), IndexLifecycleError> {
        tracing::info!("Creating index: {} with dimension {}", name, dimension);
        let descriptor = IndexDescriptor::cosine(name, dimension);
        with_timeout(
            self.settings.request_timeout,
            self.service.create(&descriptor),
        )
        .await
        .map_err(|source| IndexLifecycleError::Create {
            name: name.to_string(),
            source,
        })?;
        self.wait_until_ready(name, cancel).await
    }

    async fn delete_and_wait(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), IndexLifecycleError> {
        with_timeout(self.settings.request_timeout, self.service.delete(name))
            .await
            .map_err(|source| IndexLifecycleError::Delete {
                name: name.to_string(),
                source,
            })?;

        let started = Instant::now();
        loop {
            if self.describe(name).await?.is_none() {
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= self.settings.readiness_timeout {
                return Err(IndexLifecycleError::NotDeleted {
                    name: name.to_string(),
                    waited,
                });
            }
            if !cancel.sleep(self.settings.readiness_poll).await {
                return Err(IndexLifecycleError::Cancelled {
                    name: name.to_string(),
                });
            }
        }
    }

    async fn wait_until_ready(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), IndexLifecycleError> {
        tracing::info!("Waiting for index {} to be ready...", name);
        let started = Instant::now();
        loop {
            if matches!(self.describe(name).await?, Some(found) if found.ready) {
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= self.settings.readiness_timeout {
                return Err(IndexLifecycleError::NotReady {
                    name: name.to_string(),
                    waited,
                });
            }
            if !cancel.sleep(self.settings.readiness_poll).await {
                return Err(IndexLifecycleError::Cancelled {
                    name: name.to_string(),
                });
            }
        }
    }
}
