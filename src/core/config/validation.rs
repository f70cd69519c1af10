use serde_json::{Map, Value};

use crate::core::errors::ConfigError;

/// Range-checks a tuning document before it is deserialized.
/// Unknown sections are ignored; absent keys fall back to defaults.
pub fn validate_tuning(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_u64_field(embedding, "embedding.chunk_size", "chunk_size", 1, 2_048)?;
        validate_u64_field(embedding, "embedding.max_attempts", "max_attempts", 1, 10)?;
        validate_u64_field(
            embedding,
            "embedding.initial_backoff_secs",
            "initial_backoff_secs",
            0,
            600,
        )?;
        validate_u64_field(
            embedding,
            "embedding.inter_chunk_pause_ms",
            "inter_chunk_pause_ms",
            0,
            60_000,
        )?;
        validate_u64_field(
            embedding,
            "embedding.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_u64_field(index, "index.upsert_batch_size", "upsert_batch_size", 1, 1_000)?;
        validate_u64_field(index, "index.readiness_poll_ms", "readiness_poll_ms", 1, 60_000)?;
        validate_u64_field(
            index,
            "index.readiness_timeout_secs",
            "readiness_timeout_secs",
            1,
            3_600,
        )?;
        validate_u64_field(
            index,
            "index.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(query) = expect_optional_object(root, "query")? {
        validate_u64_field(query, "query.top_k", "top_k", 1, 100)?;
        validate_u64_field(
            query,
            "query.execution_timeout_secs",
            "execution_timeout_secs",
            1,
            600,
        )?;
        validate_u64_field(
            query,
            "query.generation_timeout_secs",
            "generation_timeout_secs",
            1,
            600,
        )?;
        validate_bool_field(query, "query.concurrent_paths", "concurrent_paths")?;
        validate_bool_field(query, "query.statement_guard", "statement_guard")?;
    }

    if let Some(conversation) = expect_optional_object(root, "conversation")? {
        validate_u64_field(conversation, "conversation.max_turns", "max_turns", 1, 1_000)?;
        validate_u64_field(
            conversation,
            "conversation.grounding_turns",
            "grounding_turns",
            0,
            1_000,
        )?;
        validate_u64_field(
            conversation,
            "conversation.max_sessions",
            "max_sessions",
            1,
            1_000_000,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::Invalid {
            key: path.to_string(),
            reason: format!("must be between {} and {}", min, max),
        });
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid {
        key: path.to_string(),
        reason: format!("expected {}", expected),
    }
}
