//! Catalog document loading: a single JSON object or an array of objects.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;

use super::normalizer::{normalize, NormalizedProduct};
use crate::core::errors::{IngestionError, ValidationError};

/// Result of normalizing a whole catalog document.
#[derive(Debug, Default)]
pub struct NormalizedCatalog {
    pub products: Vec<NormalizedProduct>,
    /// Positions of records dropped for lacking a name.
    pub skipped: Vec<usize>,
}

pub async fn read_catalog(path: &Path) -> Result<Vec<Value>, IngestionError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IngestionError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(parse_catalog(&contents)?)
}

pub fn parse_catalog(contents: &str) -> Result<Vec<Value>, ValidationError> {
    let document: Value =
        serde_json::from_str(contents).map_err(|e| ValidationError::Json(e.to_string()))?;
    match document {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        _ => Err(ValidationError::UnsupportedDocument),
    }
}

/// Normalizes every record. Nameless records are skipped and reported;
/// every other validation failure aborts the run.
pub fn normalize_catalog(raw: &[Value]) -> Result<NormalizedCatalog, ValidationError> {
    let mut catalog = NormalizedCatalog::default();
    let mut seen = HashSet::new();

    for (position, record) in raw.iter().enumerate() {
        match normalize(record, position) {
            Ok(product) => {
                if !seen.insert(product.record.id.clone()) {
                    return Err(ValidationError::DuplicateId {
                        id: product.record.id,
                        position,
                    });
                }
                catalog.products.push(product);
            }
            Err(ValidationError::MissingName { position }) => {
                tracing::warn!("Skipping catalog record {}: no name", position);
                catalog.skipped.push(position);
            }
            Err(err) => return Err(err),
        }
    }

    if catalog.products.is_empty() {
        return Err(ValidationError::EmptyCatalog);
    }
    Ok(catalog)
}
