use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.sessions.reset(&session_id).await {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    tracing::info!("Session {} reset", session_id);
    Ok(Json(json!({ "session_id": session_id, "reset": true })))
}
