//! Product catalog: canonical records, normalization and document loading.

mod loader;
mod normalizer;
mod record;

pub use loader::{normalize_catalog, parse_catalog, read_catalog, NormalizedCatalog};
pub use normalizer::{format_amount, normalize, parse_amount, NormalizedProduct};
pub use record::{Category, ProductMetadata, ProductRecord};
