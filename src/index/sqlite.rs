//! SQLite-backed vector index.
//!
//! In-process stand-in for the remote index service: one row per named
//! index plus its vectors, searched by brute-force cosine similarity.
//! Indexes are ready as soon as they are created.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::service::{
    DistanceMetric, IndexDescription, IndexDescriptor, QueryMatch, VectorIndexService, VectorItem,
};
use super::vector_math::{cosine_similarity, rank_matches};
use crate::catalog::ProductMetadata;
use crate::core::errors::ServiceError;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn open(db_path: &Path) -> Result<Self, ServiceError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ServiceError::request)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ServiceError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vector_indexes (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                metric TEXT NOT NULL DEFAULT 'cosine',
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ServiceError::request)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_vectors (
                index_name TEXT NOT NULL REFERENCES vector_indexes(name) ON DELETE CASCADE,
                vector_id TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                PRIMARY KEY (index_name, vector_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ServiceError::request)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    async fn dimension_of(&self, index: &str) -> Result<Option<usize>, ServiceError> {
        let dimension: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM vector_indexes WHERE name = ?1")
                .bind(index)
                .fetch_optional(&self.pool)
                .await
                .map_err(ServiceError::request)?;
        Ok(dimension.map(|d| d as usize))
    }
}

#[async_trait]
impl VectorIndexService for SqliteVectorIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn describe(&self, index: &str) -> Result<Option<IndexDescription>, ServiceError> {
        Ok(self.dimension_of(index).await?.map(|dimension| IndexDescription {
            descriptor: IndexDescriptor {
                name: index.to_string(),
                dimension,
                metric: DistanceMetric::Cosine,
            },
            ready: true,
        }))
    }

    async fn create(&self, descriptor: &IndexDescriptor) -> Result<(), ServiceError> {
        sqlx::query("INSERT INTO vector_indexes (name, dimension, metric) VALUES (?1, ?2, ?3)")
            .bind(&descriptor.name)
            .bind(descriptor.dimension as i64)
            .bind(descriptor.metric.as_str())
            .execute(&self.pool)
            .await
            .map_err(ServiceError::request)?;
        Ok(())
    }

    async fn delete(&self, index: &str) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await.map_err(ServiceError::request)?;
        sqlx::query("DELETE FROM index_vectors WHERE index_name = ?1")
            .bind(index)
            .execute(&mut *tx)
            .await
            .map_err(ServiceError::request)?;
        sqlx::query("DELETE FROM vector_indexes WHERE name = ?1")
            .bind(index)
            .execute(&mut *tx)
            .await
            .map_err(ServiceError::request)?;
        tx.commit().await.map_err(ServiceError::request)?;
        Ok(())
    }

    async fn upsert(&self, index: &str, items: &[VectorItem]) -> Result<(), ServiceError> {
        if items.is_empty() {
            return Ok(());
        }
        let Some(dimension) = self.dimension_of(index).await? else {
            return Err(ServiceError::Status {
                status: 404,
                body: format!("index {} does not exist", index),
            });
        };

        let mut tx = self.pool.begin().await.map_err(ServiceError::request)?;
        for item in items {
            if item.values.len() != dimension {
                return Err(ServiceError::Status {
                    status: 400,
                    body: format!(
                        "vector {} has dimension {}, index {} expects {}",
                        item.id,
                        item.values.len(),
                        index,
                        dimension
                    ),
                });
            }
            let metadata = serde_json::to_string(&item.metadata).map_err(ServiceError::malformed)?;
            sqlx::query(
                "INSERT OR REPLACE INTO index_vectors (index_name, vector_id, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(index)
            .bind(&item.id)
            .bind(&metadata)
            .bind(Self::serialize_embedding(&item.values))
            .execute(&mut *tx)
            .await
            .map_err(ServiceError::request)?;
        }
        tx.commit().await.map_err(ServiceError::request)?;
        Ok(())
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, ServiceError> {
        let rows = sqlx::query(
            "SELECT vector_id, metadata, embedding FROM index_vectors WHERE index_name = ?1",
        )
        .bind(index)
        .fetch_all(&self.pool)
        .await
        .map_err(ServiceError::request)?;

        let scored = rows
            .iter()
            .map(|row| {
                let embedding: Vec<u8> = row.get("embedding");
                let metadata: String = row.get("metadata");
                QueryMatch {
                    id: row.get("vector_id"),
                    score: cosine_similarity(vector, &Self::deserialize_embedding(&embedding)),
                    metadata: serde_json::from_str::<ProductMetadata>(&metadata)
                        .unwrap_or_default(),
                }
            })
            .collect();

        Ok(rank_matches(scored, top_k))
    }

    async fn count(&self, index: &str) -> Result<usize, ServiceError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_vectors WHERE index_name = ?1")
            .bind(index)
            .fetch_one(&self.pool)
            .await
            .map_err(ServiceError::request)?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_index() -> (tempfile::TempDir, SqliteVectorIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteVectorIndex::open(&dir.path().join("vectors.db"))
            .await
            .unwrap();
        (dir, index)
    }

    fn item(id: &str, values: Vec<f32>) -> VectorItem {
        VectorItem {
            id: id.to_string(),
            values,
            metadata: ProductMetadata {
                name: format!("name of {}", id),
                ..ProductMetadata::default()
            },
        }
    }

    #[tokio::test]
    async fn describe_reports_created_dimension() {
        let (_dir, index) = test_index().await;
        assert!(index.describe("products").await.unwrap().is_none());

        index
            .create(&IndexDescriptor::cosine("products", 3))
            .await
            .unwrap();
        let described = index.describe("products").await.unwrap().unwrap();
        assert_eq!(described.descriptor.dimension, 3);
        assert!(described.ready);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id_and_query_ranks() {
        let (_dir, index) = test_index().await;
        index
            .create(&IndexDescriptor::cosine("products", 2))
            .await
            .unwrap();

        index
            .upsert("products", &[item("a", vec![1.0, 0.0]), item("b", vec![0.0, 1.0])])
            .await
            .unwrap();
        index
            .upsert("products", &[item("a", vec![1.0, 0.1])])
            .await
            .unwrap();
        assert_eq!(index.count("products").await.unwrap(), 2);

        let matches = index.query("products", &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(matches[0].id, "a");
        assert_eq!(matches[0].metadata.name, "name of a");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn empty_or_missing_index_queries_return_nothing() {
        let (_dir, index) = test_index().await;
        assert!(index.query("missing", &[1.0], 3).await.unwrap().is_empty());

        index
            .create(&IndexDescriptor::cosine("products", 1))
            .await
            .unwrap();
        assert!(index.query("products", &[1.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_drops_vectors_and_rejects_wrong_dimension() {
        let (_dir, index) = test_index().await;
        index
            .create(&IndexDescriptor::cosine("products", 2))
            .await
            .unwrap();
        assert!(index
            .upsert("products", &[item("a", vec![1.0, 0.0, 0.0])])
            .await
            .is_err());

        index.upsert("products", &[item("a", vec![1.0, 0.0])]).await.unwrap();
        index.delete("products").await.unwrap();
        assert!(index.describe("products").await.unwrap().is_none());
        assert_eq!(index.count("products").await.unwrap(), 0);
    }
}
