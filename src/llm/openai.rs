use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::CompletionService;
use super::types::CompletionRequest;
use crate::core::errors::{ConfigError, ServiceError};

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct OpenAiChat {
    base_url: String,
    model: String,
    client: Client,
    timeout: Duration,
}

impl OpenAiChat {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::Missing("CHAT_MODEL"));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim())).map_err(|_| {
                ConfigError::Invalid {
                    key: "OPENAI_API_KEY".to_string(),
                    reason: "not a valid header value".to_string(),
                }
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

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client,
            timeout,
        })
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages(),
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }
        body
    }
}

#[async_trait]
impl CompletionService for OpenAiChat {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);

        let res = self
            .client
            .post(&url)
            .json(&self.body(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(self.timeout)
                } else {
                    ServiceError::request(e)
                }
            })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ServiceError::Status { status, body });
        }

        let payload: Value = res.json().await.map_err(ServiceError::malformed)?;
        extract_content(&payload)
    }
}

fn extract_content(payload: &Value) -> Result<String, ServiceError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Malformed("response has no message content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_messages_and_sampling() {
        let chat = OpenAiChat::new(
            "sk-test",
            "https://api.openai.com/v1/",
            "gpt-4o-mini".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        let request = CompletionRequest::new("sys", "hello")
            .with_temperature(0.3)
            .with_max_tokens(150);

        let body = chat.body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 150);
        assert!(body.get("temperature").is_some());
        assert_eq!(chat.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn content_is_extracted_from_first_choice() {
        let payload = json!({ "choices": [{ "message": { "content": "SELECT 1" } }] });
        assert_eq!(extract_content(&payload).unwrap(), "SELECT 1");
        assert!(extract_content(&json!({ "choices": [] })).is_err());
    }
}
