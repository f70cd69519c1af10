#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_assistant::core::config::Settings;
use catalog_assistant::core::errors::ServiceError;
use catalog_assistant::llm::{CompletionRequest, CompletionService};
use catalog_assistant::state::Services;

pub const INDEX_NAME: &str = "cheese-products";

/// Completion fake: SQL prompts get `sql`, answer prompts get `answer`.
/// Every request is recorded.
pub struct ScriptedCompletion {
    pub sql: Result<String, ServiceError>,
    pub answer: Result<String, ServiceError>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(sql: &str, answer: &str) -> Self {
        Self {
            sql: Ok(sql.to_string()),
            answer: Ok(answer.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answer_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !is_sql_request(r))
            .map(|r| r.user_prompt.clone())
            .collect()
    }
}

fn is_sql_request(request: &CompletionRequest) -> bool {
    request.system_prompt.starts_with("You are a SQL query generator")
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError> {
        let reply = if is_sql_request(&request) {
            self.sql.clone()
        } else {
            self.answer.clone()
        };
        self.requests.lock().unwrap().push(request);
        reply
    }
}

/// Offline settings: hashing embedder, SQLite index, data under `data_dir`.
pub fn offline_settings(data_dir: &Path) -> Settings {
    offline_settings_with(data_dir, &[])
}

/// Like [`offline_settings`] with extra or overriding keys.
pub fn offline_settings_with(data_dir: &Path, extra: &[(&str, &str)]) -> Settings {
    let prompt = data_dir.join("prompt.txt");
    std::fs::create_dir_all(data_dir).unwrap();
    std::fs::write(&prompt, "You are a helpful cheese assistant.").unwrap();

    let values: HashMap<String, String> = [
        ("EMBEDDING_MODEL", "hashing"),
        ("CHAT_MODEL", "scripted"),
        ("INDEX_NAME", INDEX_NAME),
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_BASE_URL", "http://127.0.0.1:9"),
        ("EMBEDDING_BACKEND", "hashing"),
        ("HASHING_DIMENSION", "256"),
        ("VECTOR_BACKEND", "sqlite"),
        ("CATALOG_DATA_DIR", data_dir.to_str().unwrap()),
        ("CATALOG_PROMPT_PATH", prompt.to_str().unwrap()),
    ]
    .into_iter()
    .chain(extra.iter().copied())
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Settings::from_map(&values).unwrap()
}

/// Builds offline services and swaps in `completion`.
pub async fn services(data_dir: &Path, completion: Arc<ScriptedCompletion>) -> Services {
    services_with(offline_settings(data_dir), completion).await
}

pub async fn services_with(settings: Settings, completion: Arc<ScriptedCompletion>) -> Services {
    let services = Services::build(settings).await.unwrap();
    let completion: Arc<dyn CompletionService> = completion;
    Services {
        completion,
        ..services
    }
}

pub fn write_catalog(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("catalog.json");
    std::fs::write(&path, json).unwrap();
    path
}
