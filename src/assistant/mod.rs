mod service;
mod synthesizer;

pub use service::{AssistantReply, ProductAssistant};
pub use synthesizer::{load_system_prompt, AnswerSynthesizer};
