//! OpenAI-compatible embeddings client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::EmbeddingService;
use crate::core::errors::{ConfigError, ServiceError};

/// Single-attempt client; retries and pacing belong to the batcher.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::Missing("EMBEDDING_MODEL"));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| ConfigError::Invalid {
                key: "OPENAI_API_KEY".to_string(),
                reason: "not a valid header value".to_string(),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "OPENAI_BASE_URL".to_string(),
                reason: e.to_string(),
            })?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            timeout,
        })
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(self.timeout)
                } else {
                    ServiceError::request(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingResponse = resp.json().await.map_err(ServiceError::malformed)?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(ServiceError::Malformed(format!(
                "{} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }
        Ok(parsed
            .data
            .into_iter()
            .map(|entry| entry.embedding)
            .collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_entries_are_reordered_by_index() {
        let mut parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[2.0],"index":1},{"embedding":[1.0],"index":0}]}"#,
        )
        .unwrap();
        parsed.data.sort_by_key(|entry| entry.index);
        assert_eq!(parsed.data[0].embedding, vec![1.0]);
    }

    #[test]
    fn rejects_empty_model() {
        let result = OpenAiEmbedder::new(
            "sk-test",
            "https://api.openai.com/v1",
            " ".to_string(),
            Duration::from_secs(5),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_input_skips_the_network() {
        let embedder = OpenAiEmbedder::new(
            "sk-test",
            "http://127.0.0.1:9",
            "text-embedding-3-small".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }
}
