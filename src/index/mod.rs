//! Similarity index: backend seam, local and remote backends, lifecycle manager.

mod manager;
mod pinecone;
mod service;
mod sqlite;
mod vector_math;

pub use manager::{IndexOutcome, IndexSettings, VectorIndexManager};
pub use pinecone::{PineconeConfig, PineconeIndex};
pub use service::{
    DistanceMetric, IndexDescription, IndexDescriptor, QueryMatch, VectorIndexService, VectorItem,
};
pub use sqlite::SqliteVectorIndex;
pub use vector_math::{cosine_similarity, rank_matches};
