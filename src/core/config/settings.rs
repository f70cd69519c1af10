use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use super::paths::AppPaths;
use super::tuning::Tuning;
use crate::core::errors::ConfigError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";
const DEFAULT_HASHING_DIMENSION: usize = 384;

#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingBackend {
    OpenAi,
    Hashing { dimension: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorBackend {
    Sqlite,
    Pinecone {
        api_key: String,
        control_url: String,
        cloud: String,
        region: String,
    },
}

/// Startup configuration, read once from environment-style keys.
#[derive(Debug, Clone)]
pub struct Settings {
    pub embedding_model: String,
    pub chat_model: String,
    pub index_name: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub embedding_backend: EmbeddingBackend,
    pub vector_backend: VectorBackend,
    pub paths: AppPaths,
    pub prompt_path: PathBuf,
    pub port: u16,
    pub tuning: Tuning,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| values.get(key).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let embedding_model = required("EMBEDDING_MODEL")?;
        let chat_model = required("CHAT_MODEL")?;
        let index_name = required("INDEX_NAME")?;
        let openai_api_key = get("OPENAI_API_KEY");
        let openai_base_url =
            get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

        let embedding_backend = match get("EMBEDDING_BACKEND").as_deref() {
            None | Some("openai") => EmbeddingBackend::OpenAi,
            Some("hashing") => {
                let dimension = match get("HASHING_DIMENSION") {
                    Some(raw) => parse_number("HASHING_DIMENSION", &raw)?,
                    None => DEFAULT_HASHING_DIMENSION,
                };
                if dimension == 0 {
                    return Err(invalid("HASHING_DIMENSION", "must be greater than zero"));
                }
                EmbeddingBackend::Hashing { dimension }
            }
            Some(other) => {
                return Err(invalid(
                    "EMBEDDING_BACKEND",
                    &format!("unknown backend '{}'; use openai or hashing", other),
                ))
            }
        };

        let vector_backend = match get("VECTOR_BACKEND").as_deref() {
            None | Some("sqlite") => VectorBackend::Sqlite,
            Some("pinecone") => VectorBackend::Pinecone {
                api_key: required("PINECONE_API_KEY")?,
                control_url: get("PINECONE_CONTROL_URL")
                    .unwrap_or_else(|| DEFAULT_PINECONE_CONTROL_URL.to_string()),
                cloud: get("PINECONE_CLOUD").unwrap_or_else(|| "aws".to_string()),
                region: get("PINECONE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            },
            Some(other) => {
                return Err(invalid(
                    "VECTOR_BACKEND",
                    &format!("unknown backend '{}'; use sqlite or pinecone", other),
                ))
            }
        };

        // Chat completion always goes through the OpenAI-compatible API.
        if openai_api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }

        let paths = AppPaths::new(get("CATALOG_DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let prompt_path = PathBuf::from(
            get("CATALOG_PROMPT_PATH").unwrap_or_else(|| "prompt.txt".to_string()),
        );
        let port = match get("PORT") {
            Some(raw) => parse_number::<u16>("PORT", &raw)?,
            None => 8080,
        };
        let tuning = match get("CATALOG_CONFIG_PATH") {
            Some(path) => Tuning::load(&PathBuf::from(path))?,
            None => Tuning::default(),
        };

        Ok(Settings {
            embedding_model,
            chat_model,
            index_name,
            openai_api_key,
            openai_base_url,
            embedding_backend,
            vector_backend,
            paths,
            prompt_path,
            port,
            tuning,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>()
        .map_err(|_| invalid(key, &format!("'{}' is not a valid number", raw)))
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
