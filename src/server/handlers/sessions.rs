use std::sync::Arc;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::document::UploadedDocument;
use crate::history::{export_markdown, SharedSession};
use crate::rag::QuestionRequest;
use crate::state::AppState;

const DEFAULT_UPLOAD_NAME: &str = "upload";

async fn find_session(state: &AppState, session_id: &str) -> Result<SharedSession, ApiError> {
    let id = Uuid::parse_str(session_id)
        .map_err(|_| ApiError::NotFound("Session not found".to_string()))?;
    state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = state.sessions.create().await;
    Json(json!({"session_id": session_id}))
}

/// Ends a session, dropping its history and uploaded document.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::parse_str(&session_id)
        .map_err(|_| ApiError::NotFound("Session not found".to_string()))?;
    if !state.sessions.remove(&id).await {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    tracing::info!("Session {} ended", session_id);
    Ok(Json(json!({"status": "success"})))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &session_id).await?;
    let session = session.lock().await;
    Ok(Json(json!({
        "session_id": session_id,
        "turns": session.turns(),
        "document": session.document().map(|d| d.name.clone())
    })))
}

pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &session_id).await?;
    let mut session = session.lock().await;
    session.clear();
    Ok(Json(json!({"status": "success", "history_len": session.len()})))
}

/// Replaces the session's uploaded document. The raw body is the file;
/// `Content-Type` and `X-File-Name` select how it is read.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Uploaded document is empty".to_string()));
    }

    let session = find_session(&state, &session_id).await?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_UPLOAD_NAME);

    let document = UploadedDocument::from_bytes(name, content_type, &body)?;
    let chars = document.text.chars().count();
    tracing::info!("Session {} uploaded '{}' ({} chars)", session_id, name, chars);

    session.lock().await.set_document(document);
    Ok(Json(json!({"status": "success", "name": name, "chars": chars})))
}

pub async fn remove_document(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &session_id).await?;
    let removed = session.lock().await.take_document().is_some();
    Ok(Json(json!({"status": "success", "removed": removed})))
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question must not be empty".to_string()));
    }

    let session = find_session(&state, &session_id).await?;
    let mut session = session.lock().await;
    let turn = state.answers.answer(&mut session, &payload).await;

    Ok(Json(json!({
        "answer": turn.bot_answer,
        "source": turn.source,
        "history_len": session.len()
    })))
}

pub async fn export(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &session_id).await?;
    let markdown = export_markdown(session.lock().await.turns(), Utc::now());

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"chat_history.md\"",
            ),
        ],
        markdown,
    ))
}
