//! Route handler functions for all API endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use wayfarer_chat::{ChatReply, SessionSnapshot};
use wayfarer_core::CapabilityFlags;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for POST /chat.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: ChatReply,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearSessionResponse {
    pub message: String,
    pub session_id: String,
    pub existed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
    pub capabilities: CapabilityFlags,
    pub warnings: Vec<String>,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /chat - run one dialogue turn.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = body?;
    let reply = state
        .orchestrator
        .handle_message(&body.message, body.session_id.as_deref())
        .await?;

    Ok(Json(ChatResponse {
        session_id: reply.session_id.clone(),
        response: reply,
    }))
}

/// DELETE /session/{id} - forget a session. Idempotent.
pub async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClearSessionResponse>, ApiError> {
    let existed = state.orchestrator.clear_session(&id).await?;
    Ok(Json(ClearSessionResponse {
        message: "Session cleared".to_string(),
        session_id: id,
        existed,
    }))
}

/// GET /session/{id} - inspect a session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state.orchestrator.session_snapshot(&id).await?;
    Ok(Json(snapshot))
}

/// GET /health - liveness plus provider availability.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.orchestrator.active_sessions(),
        capabilities: state.capabilities,
        warnings: state.capabilities.warnings(),
    })
}

/// GET /config/status - which providers have credentials.
pub async fn config_status(State(state): State<AppState>) -> Json<CapabilityFlags> {
    Json(state.capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use tower::ServiceExt;
    use wayfarer_chat::{ReplyKind, TripOrchestrator};
    use wayfarer_core::config::ChatConfig;
    use wayfarer_core::WayfarerConfig;
    use wayfarer_providers::{DisabledMailer, MockSearch, PatternExtractor};

    use crate::error::ErrorBody;

    fn make_state() -> AppState {
        let today = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let orchestrator = TripOrchestrator::new(
            ChatConfig::default(),
            Arc::new(PatternExtractor::new("EUR").with_today(today)),
            Arc::new(MockSearch::new("EUR")),
            Arc::new(DisabledMailer),
        );
        AppState::new(
            WayfarerConfig::default(),
            orchestrator,
            CapabilityFlags::default(),
        )
    }

    fn make_app() -> axum::Router {
        crate::create_router(make_state())
    }

    fn post_chat(body: &str) -> Request<Body> {
        Request::post("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = make_app();
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let health: HealthResponse = read_json(resp).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.active_sessions, 0);
        assert!(!health.capabilities.language_model);
        assert_eq!(health.warnings.len(), 3);
    }

    #[tokio::test]
    async fn test_config_status_endpoint() {
        let app = make_app();
        let resp = app
            .oneshot(Request::get("/config/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let flags: CapabilityFlags = read_json(resp).await;
        assert_eq!(flags, CapabilityFlags::default());
    }

    #[tokio::test]
    async fn test_chat_returns_question() {
        let app = make_app();
        let resp = app
            .oneshot(post_chat(r#"{"message": "from Porto to London"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let chat: ChatResponse = read_json(resp).await;
        assert_eq!(chat.response.kind, ReplyKind::Question);
        assert_eq!(chat.session_id, chat.response.session_id);
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let app = make_app();
        let resp = app
            .oneshot(post_chat(r#"{"message": "   "}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: ErrorBody = read_json(resp).await;
        assert_eq!(err.error, "bad_request");
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_json() {
        let app = make_app();
        let resp = app.oneshot(post_chat("{not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_message_field() {
        let app = make_app();
        let resp = app
            .oneshot(post_chat(r#"{"session_id": "abc"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_clear_unknown_session_is_ok() {
        let app = make_app();
        let resp = app
            .oneshot(
                Request::delete("/session/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cleared: ClearSessionResponse = read_json(resp).await;
        assert_eq!(cleared.message, "Session cleared");
        assert_eq!(cleared.session_id, "nope");
        assert!(!cleared.existed);
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_404() {
        let app = make_app();
        let resp = app
            .oneshot(Request::get("/session/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let err: ErrorBody = read_json(resp).await;
        assert_eq!(err.error, "not_found");
        assert_eq!(err.message, "Session not found: nope");
    }
}
