use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use super::cancel::CancellationToken;
use crate::catalog::{normalize_catalog, read_catalog};
use crate::core::errors::IngestionError;
use crate::embedding::EmbeddingBatcher;
use crate::index::{IndexOutcome, VectorIndexManager, VectorItem};
use crate::sql::{ProductRow, ProductStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Always destroy and rebuild the index, even when its dimension matches.
    pub recreate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub records: usize,
    pub skipped: Vec<usize>,
    pub dimension: usize,
    pub index_outcome: IndexOutcome,
    pub vectors_upserted: usize,
    pub rows_written: usize,
}

/// Catalog document to vectors plus row store, as one fatal-on-error run.
#[derive(Clone)]
pub struct IngestionPipeline {
    batcher: EmbeddingBatcher,
    index: VectorIndexManager,
    store: ProductStore,
    index_name: String,
}

impl IngestionPipeline {
    pub fn new(
        batcher: EmbeddingBatcher,
        index: VectorIndexManager,
        store: ProductStore,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            batcher,
            index,
            store,
            index_name: index_name.into(),
        }
    }

    pub async fn ingest_file(
        &self,
        path: &Path,
        options: IngestOptions,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IngestionError> {
        tracing::info!("Loading catalog from {}", path.display());
        let raw = read_catalog(path).await?;
        self.ingest(&raw, options, cancel).await
    }

    pub async fn ingest(
        &self,
        raw: &[Value],
        options: IngestOptions,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IngestionError> {
        let catalog = normalize_catalog(raw)?;
        tracing::info!(
            "Normalized {} products ({} skipped)",
            catalog.products.len(),
            catalog.skipped.len()
        );

        let texts: Vec<String> = catalog.products.iter().map(|p| p.text.clone()).collect();
        let vectors = self.batcher.embed_batch(&texts, cancel).await?;

        let dimension = vectors.first().map(Vec::len).unwrap_or_default();
        for (product, vector) in catalog.products.iter().zip(&vectors) {
            if vector.len() != dimension || dimension == 0 {
                return Err(IngestionError::DimensionMismatch {
                    id: product.record.id.clone(),
                    expected: dimension,
                    got: vector.len(),
                });
            }
        }
        tracing::info!("Generated embeddings with dimension {}", dimension);

        let index_outcome = if options.recreate {
            self.index
                .recreate_index(&self.index_name, dimension, cancel)
                .await?
        } else {
            self.index
                .ensure_index(&self.index_name, dimension, cancel)
                .await?
        };

        let items: Vec<VectorItem> = catalog
            .products
            .iter()
            .zip(vectors)
            .map(|(product, values)| VectorItem {
                id: product.record.id.clone(),
                values,
                metadata: product.record.metadata(),
            })
            .collect();
        let vectors_upserted = self.index.upsert(&self.index_name, &items, cancel).await?;

        if cancel.is_cancelled() {
            return Err(IngestionError::Cancelled {
                upserted: vectors_upserted,
            });
        }

        let rows: Vec<ProductRow> = catalog
            .products
            .iter()
            .map(|product| ProductRow::from(&product.record))
            .collect();
        let rows_written = self.store.replace_all(&rows).await?;

        tracing::info!(
            "Ingested {} products into index {} ({:?})",
            vectors_upserted,
            self.index_name,
            index_outcome
        );

        Ok(IngestReport {
            records: catalog.products.len(),
            skipped: catalog.skipped,
            dimension,
            index_outcome,
            vectors_upserted,
            rows_written,
        })
    }
}
