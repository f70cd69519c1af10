use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let (session_id, window) = state
        .sessions
        .get_or_create(payload.session_id.as_deref())
        .await;
    // Held across the call so one session's turns stay ordered.
    let mut window = window.lock().await;
    let reply = state.assistant.ask(&mut window, message).await?;

    Ok(Json(json!({
        "session_id": session_id,
        "answer": reply.answer,
        "grounding": reply.grounding,
        "route": reply.route,
    })))
}
