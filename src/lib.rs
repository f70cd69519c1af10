pub mod assistant;
pub mod catalog;
pub mod context;
pub mod core;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod router;
pub mod server;
pub mod sql;
pub mod state;
