//! Structured Query Generator.
//!
//! Turns a question into SQL text through the completion service. The only
//! post-processing is code-fence stripping; the text is not otherwise
//! inspected here.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;

use crate::core::errors::{with_timeout, QueryError};
use crate::llm::{CompletionRequest, CompletionService};

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 150;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("fence regex is valid"));

pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

#[derive(Clone)]
pub struct StructuredQueryGenerator {
    completion: Arc<dyn CompletionService>,
    timeout: Duration,
}

impl StructuredQueryGenerator {
    pub fn new(completion: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            completion,
            timeout,
        }
    }

    /// `schema_description` is embedded unmodified in the system prompt.
    pub async fn generate(
        &self,
        question: &str,
        schema_description: &str,
    ) -> Result<String, QueryError> {
        let request = CompletionRequest::new(system_prompt(schema_description), question)
            .with_temperature(TEMPERATURE)
            .with_max_tokens(MAX_TOKENS);

        let raw = with_timeout(self.timeout, self.completion.complete(request))
            .await
            .map_err(|e| QueryError::Generation(e.to_string()))?;

        let query = strip_code_fences(&raw);
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        tracing::debug!("Generated SQL: {}", query);
        Ok(query)
    }
}

fn system_prompt(schema_description: &str) -> String {
    format!(
        "You are a SQL query generator. Convert the user's question about cheese or cheese \
         products into a valid SQLite query.\n{}\n\
         Return ONLY the SQL query without any explanation, markdown formatting, or backticks.",
        schema_description
    )
}
