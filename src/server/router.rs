use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{config, health, sessions};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware
/// - Health check endpoint
/// - API endpoints (config, sessions, questions, document upload, export)
/// - Upload body limit from `server.upload_max_bytes`
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    let upload_limit = DefaultBodyLimit::max(state.settings.server.upload_max_bytes);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/config", get(config::get_config))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:session_id",
            delete(sessions::delete_session),
        )
        .route(
            "/api/sessions/:session_id/history",
            get(sessions::get_history).delete(sessions::clear_history),
        )
        .route(
            "/api/sessions/:session_id/document",
            put(sessions::upload_document)
                .delete(sessions::remove_document)
                .layer(upload_limit),
        )
        .route("/api/sessions/:session_id/ask", post(sessions::ask))
        .route("/api/sessions/:session_id/export", get(sessions::export))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(&state.settings.server.cors_allowed_origins)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-file-name"),
        ])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://localhost:8501".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8501".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core::config::{AppConfig, AppPaths};
    use crate::document::SourceDocument;
    use crate::embedding::{Embedder, HashingEmbedder};
    use crate::rag::retriever::test_support::ScriptedGenerator;
    use crate::rag::{Chunker, Ingestor};

    async fn test_app(with_index: bool) -> (tempfile::TempDir, Router) {
        test_app_with(with_index, AppConfig::default()).await
    }

    async fn test_app_with(with_index: bool, settings: AppConfig) -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::rooted_at(dir.path()));
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(64).unwrap());

        if with_index {
            Ingestor::new(Chunker::default(), embedder.clone())
                .build(&[SourceDocument {
                    id: "hours.txt".to_string(),
                    text: "The library opens at 8 AM and closes at 10 PM on weekdays.".to_string(),
                }])
                .await
                .unwrap()
                .save(&paths.index_dir)
                .unwrap();
        }

        let generator = Arc::new(ScriptedGenerator::new(|prompt| {
            if prompt.contains("Context:") {
                Ok("The library opens at 8 AM.".to_string())
            } else if prompt.starts_with("Summarize") {
                Ok("- short summary".to_string())
            } else {
                Ok("General answer.".to_string())
            }
        }));
        let state = AppState::from_parts(paths, settings, embedder, generator);
        (dir, router(Arc::new(state)))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, empty_request("POST", "/api/sessions")).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        value["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (_dir, app) = test_app(false).await;
        let (status, body) = send(&app, empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
    }

    #[tokio::test]
    async fn ask_flow_records_history_and_exports() {
        let (_dir, app) = test_app(true).await;
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/sessions/{}/ask", id),
                json!({"question": "When does the library open?"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let answer: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(answer["source"], "corpus");
        assert_eq!(answer["answer"], "The library opens at 8 AM.");
        assert_eq!(answer["history_len"], 1);

        let (_, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/sessions/{}/ask", id),
                json!({"question": "Who wrote Hamlet?", "open_domain_mode": true}),
            ),
        )
        .await;
        let answer: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(answer["source"], "open_domain");
        assert_eq!(answer["history_len"], 2);

        let (_, body) = send(&app, empty_request("GET", &format!("/api/sessions/{}/history", id))).await;
        let history: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(history["turns"][0]["user_question"], "Who wrote Hamlet?");

        let (status, body) = send(&app, empty_request("GET", &format!("/api/sessions/{}/export", id))).await;
        assert_eq!(status, StatusCode::OK);
        let markdown = String::from_utf8(body).unwrap();
        assert!(markdown.find("When does the library open?") < markdown.find("Who wrote Hamlet?"));

        let (status, body) = send(&app, empty_request("DELETE", &format!("/api/sessions/{}/history", id))).await;
        assert_eq!(status, StatusCode::OK);
        let cleared: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(cleared["history_len"], 0);
    }

    #[tokio::test]
    async fn uploaded_document_is_summarized() {
        let (_dir, app) = test_app(false).await;
        let id = new_session(&app).await;

        let upload = Request::builder()
            .method("PUT")
            .uri(format!("/api/sessions/{}/document", id))
            .header(header::CONTENT_TYPE, "text/plain")
            .header("x-file-name", "rules.txt")
            .body(Body::from("Attendance is mandatory for all lectures."))
            .unwrap();
        let (status, _) = send(&app, upload).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/sessions/{}/ask", id),
                json!({"question": "Summarize", "summary_mode": true}),
            ),
        )
        .await;
        let answer: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(answer["source"], "summary");
        assert_eq!(answer["answer"], "- short summary");
    }

    #[tokio::test]
    async fn missing_index_still_answers_open_domain() {
        let (_dir, app) = test_app(false).await;
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/sessions/{}/ask", id),
                json!({"question": "When does the library open?"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let answer: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(answer["source"], "open_domain");
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let (_dir, app) = test_app(false).await;
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{}/ask", id), json!({"question": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert!(error["error"].as_str().is_some());
    }

    fn upload_request(id: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(format!("/api/sessions/{}/document", id))
            .header(header::CONTENT_TYPE, "text/plain")
            .header("x-file-name", "handbook.txt")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn uploads_larger_than_two_megabytes_are_accepted() {
        let (_dir, app) = test_app(false).await;
        let id = new_session(&app).await;

        let (status, body) = send(&app, upload_request(&id, vec![b'a'; 3 * 1024 * 1024])).await;
        assert_eq!(status, StatusCode::OK);
        let uploaded: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(uploaded["chars"], 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn uploads_over_the_configured_limit_are_rejected() {
        let mut settings = AppConfig::default();
        settings.server.upload_max_bytes = 1024;
        let (_dir, app) = test_app_with(false, settings).await;
        let id = new_session(&app).await;

        let (status, _) = send(&app, upload_request(&id, vec![b'a'; 2048])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let (status, _) = send(&app, upload_request(&id, vec![b'a'; 512])).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn deleted_session_is_gone() {
        let (_dir, app) = test_app(false).await;
        let id = new_session(&app).await;
        send(&app, upload_request(&id, b"Attendance is mandatory.".to_vec())).await;

        let (status, body) = send(&app, empty_request("DELETE", &format!("/api/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        let deleted: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(deleted["status"], "success");

        let (status, _) = send(&app, empty_request("GET", &format!("/api/sessions/{}/history", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, empty_request("DELETE", &format!("/api/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (_dir, app) = test_app(false).await;
        let (status, _) = send(&app, empty_request("GET", "/api/sessions/not-a-session/history")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn blank_origins_fall_back_to_local_defaults() {
        let origins = resolve_allowed_origins(&["  ".to_string()]);
        assert!(origins.contains(&"http://localhost:8501".to_string()));
        assert_eq!(
            resolve_allowed_origins(&["https://campus.example ".to_string()]),
            vec!["https://campus.example".to_string()]
        );
    }
}
