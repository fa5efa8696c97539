use std::sync::Arc;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "generator": state.generator.name(),
        "index_loaded": state.resources.corpus_loaded(),
        "sessions": state.sessions.len().await
    }))
}
