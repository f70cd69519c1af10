pub mod paths;
pub mod settings;
pub mod tuning;
pub mod validation;

pub use paths::AppPaths;
pub use settings::{EmbeddingBackend, Settings, VectorBackend};
pub use tuning::{ConversationTuning, EmbeddingTuning, IndexTuning, QueryTuning, Tuning};
