//! Structured-query path: the `products` row store, its schema description,
//! the query generator and the sandboxed executor.

mod executor;
mod generator;
mod schema;
mod store;

pub use executor::{QueryExecutor, QueryRow};
pub use generator::{strip_code_fences, StructuredQueryGenerator};
pub use schema::{schema_description, PRODUCT_COLUMNS};
pub use store::{ProductRow, ProductStore};
