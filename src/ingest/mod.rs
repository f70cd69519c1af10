//! Offline ingestion: catalog document -> vectors + row store.

mod cancel;
mod pipeline;

pub use cancel::CancellationToken;
pub use pipeline::{IngestOptions, IngestReport, IngestionPipeline};
