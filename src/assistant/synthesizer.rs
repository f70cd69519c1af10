//! Answer synthesis boundary: grounding plus history in, answer text out.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::errors::{with_timeout, ConfigError, GenerationServiceError};
use crate::llm::{CompletionRequest, CompletionService};

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

/// Reads the system prompt document. A missing or blank file is fatal.
pub async fn load_system_prompt(path: &Path) -> Result<String, ConfigError> {
    let prompt = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    if prompt.trim().is_empty() {
        return Err(ConfigError::Invalid {
            key: "CATALOG_PROMPT_PATH".to_string(),
            reason: format!("{} is empty", path.display()),
        });
    }
    Ok(prompt)
}

#[derive(Clone)]
pub struct AnswerSynthesizer {
    completion: Arc<dyn CompletionService>,
    system_prompt: Arc<str>,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        system_prompt: impl Into<Arc<str>>,
        timeout: Duration,
    ) -> Self {
        Self {
            completion,
            system_prompt: system_prompt.into(),
            timeout,
        }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        history: &str,
        grounding: &str,
    ) -> Result<String, GenerationServiceError> {
        let request = CompletionRequest::new(
            self.system_prompt.to_string(),
            user_prompt(query, history, grounding),
        )
        .with_temperature(TEMPERATURE)
        .with_max_tokens(MAX_TOKENS);

        with_timeout(self.timeout, self.completion.complete(request))
            .await
            .map_err(|source| GenerationServiceError { source })
    }
}

fn user_prompt(query: &str, history: &str, grounding: &str) -> String {
    let history = if history.is_empty() {
        String::new()
    } else {
        format!("Previous conversation:\n{}", history)
    };
    format!(
        "Context:\n{}\n\nCurrent Product Information:\n{}\n\nQuestion: {}",
        history, grounding, query
    )
}
