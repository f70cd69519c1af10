//! Local relational row store: one `products` table.
//!
//! Only the ingestion job writes; query time reads through a separate
//! read-only pool.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::schema::CREATE_PRODUCTS_TABLE;
use crate::catalog::ProductRecord;
use crate::core::errors::IngestionError;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub lb_price: f64,
    pub brand: String,
    pub upc: String,
    pub sku: String,
    pub weight: f64,
    pub product_url: String,
    pub image_url: String,
}

impl From<&ProductRecord> for ProductRow {
    fn from(record: &ProductRecord) -> Self {
        Self {
            name: record.name.clone(),
            category: record.category.label().to_string(),
            price: record.price,
            lb_price: record.price_per_weight_unit.unwrap_or(0.0),
            brand: record.brand.clone(),
            upc: record.upc.clone(),
            sku: record.sku.clone(),
            weight: record.weight,
            product_url: record.product_url.clone(),
            image_url: record.image_url.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ProductStore {
    pool: SqlitePool,
    reader: SqlitePool,
    db_path: PathBuf,
}

fn store_error(err: sqlx::Error) -> IngestionError {
    IngestionError::Store(err.to_string())
}

impl ProductStore {
    pub async fn open(db_path: &Path) -> Result<Self, IngestionError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_error)?;

        sqlx::query(CREATE_PRODUCTS_TABLE)
            .execute(&pool)
            .await
            .map_err(store_error)?;

        let reader_options = SqliteConnectOptions::new()
            .filename(db_path)
            .read_only(true);
        let reader = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(reader_options)
            .await
            .map_err(store_error)?;

        Ok(Self {
            pool,
            reader,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Read-only pool for the structured-query executor.
    pub fn reader(&self) -> SqlitePool {
        self.reader.clone()
    }

    /// Replaces the whole table in one transaction.
    pub async fn replace_all(&self, rows: &[ProductRow]) -> Result<usize, IngestionError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        sqlx::query("DELETE FROM products")
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        for row in rows {
            sqlx::query(
                "INSERT INTO products (
                    name, category, price, lb_price, brand, upc, sku, weight, product_url, image_url
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .bind(&row.name)
            .bind(&row.category)
            .bind(row.price)
            .bind(row.lb_price)
            .bind(&row.brand)
            .bind(&row.upc)
            .bind(&row.sku)
            .bind(row.weight)
            .bind(&row.product_url)
            .bind(&row.image_url)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)?;
        tracing::info!("Row store now holds {} products", rows.len());
        Ok(rows.len())
    }

    pub async fn count(&self) -> Result<usize, IngestionError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.reader)
            .await
            .map_err(store_error)?;
        Ok(count as usize)
    }
}
