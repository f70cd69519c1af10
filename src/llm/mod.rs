pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiChat;
pub use provider::CompletionService;
pub use types::{ChatMessage, CompletionRequest};
