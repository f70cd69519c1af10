use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, health, sessions};
use crate::state::AppState;

/// Creates the HTTP router: health check, chat and session reset.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat", post(chat::chat))
        .route(
            "/api/sessions/:session_id/reset",
            post(sessions::reset_session),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
