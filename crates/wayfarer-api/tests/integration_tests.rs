//! Integration tests for the Wayfarer API.
//!
//! Drives full conversations through the router with the offline extractor,
//! mock search and either a disabled or a recording mailer. Each test builds
//! its own state; nothing touches the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

use wayfarer_api::create_router;
use wayfarer_api::handlers::{ChatResponse, ClearSessionResponse, HealthResponse};
use wayfarer_api::state::AppState;
use wayfarer_chat::{ReplyKind, SessionPhase, SessionSnapshot, TripOrchestrator};
use wayfarer_core::config::ChatConfig;
use wayfarer_core::{CapabilityFlags, Money, TravelPackage, TravelRequest, WayfarerConfig};
use wayfarer_providers::{
    DeliveryError, DisabledMailer, Mailer, MockSearch, PatternExtractor,
};

// =============================================================================
// Helpers
// =============================================================================

const PORTO_LONDON: &str =
    "Book a trip from Porto to London next weekend for 3 days under 500 euros";

struct RecordingMailer {
    sent: AtomicUsize,
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(
        &self,
        _request: &TravelRequest,
        _package: &TravelPackage,
    ) -> Result<(), DeliveryError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Build a router around the given mailer. Dates resolve against
/// Wednesday 2026-10-14.
fn make_app_with(mailer: Arc<dyn Mailer>, capabilities: CapabilityFlags) -> axum::Router {
    let today = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
    let orchestrator = TripOrchestrator::new(
        ChatConfig::default(),
        Arc::new(PatternExtractor::new("EUR").with_today(today)),
        Arc::new(MockSearch::new("EUR")),
        mailer,
    );
    create_router(AppState::new(
        WayfarerConfig::default(),
        orchestrator,
        capabilities,
    ))
}

fn make_app() -> axum::Router {
    make_app_with(Arc::new(DisabledMailer), CapabilityFlags::default())
}

fn chat_request(message: &str, session_id: Option<&str>) -> Request<Body> {
    let body = serde_json::json!({ "message": message, "session_id": session_id });
    Request::post("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn chat(app: &axum::Router, message: &str, session_id: Option<&str>) -> ChatResponse {
    let resp = app
        .clone()
        .oneshot(chat_request(message, session_id))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_value(body_json(resp).await).unwrap()
}

async fn snapshot(app: &axum::Router, session_id: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::get(format!("/session/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

// =============================================================================
// Conversations
// =============================================================================

#[tokio::test]
async fn test_first_message_asks_for_email() {
    let app = make_app();
    let chat = chat(&app, PORTO_LONDON, None).await;

    assert_eq!(chat.response.kind, ReplyKind::Question);
    assert!(chat.response.message.contains("email"));
    assert!(!chat.session_id.is_empty());
    assert_eq!(chat.session_id, chat.response.session_id);
}

#[tokio::test]
async fn test_email_follow_up_completes_within_budget() {
    let mailer = Arc::new(RecordingMailer {
        sent: AtomicUsize::new(0),
    });
    let capabilities = CapabilityFlags {
        email: true,
        ..Default::default()
    };
    let app = make_app_with(mailer.clone(), capabilities);

    let first = chat(&app, PORTO_LONDON, None).await;
    let second = chat(&app, "jane@example.com", Some(&first.session_id)).await;

    assert_eq!(second.session_id, first.session_id);
    assert_eq!(second.response.kind, ReplyKind::Complete);
    assert_eq!(second.response.email_sent, Some(true));
    assert_eq!(mailer.sent.load(Ordering::SeqCst), 1);

    let package = second.response.package.unwrap();
    let budget = Money::new(50000, "EUR");
    assert!(package.within_budget(Some(&budget)));
    assert_eq!(package.flight().airline, "TAP Air Portugal");
    assert_eq!(package.accommodation().name, "Hotel Central London");
}

#[tokio::test]
async fn test_complete_reply_json_shape() {
    let app = make_app();
    let first = chat(&app, PORTO_LONDON, None).await;
    let resp = app
        .clone()
        .oneshot(chat_request("jane@example.com", Some(&first.session_id)))
        .await
        .unwrap();
    let json = body_json(resp).await;

    assert_eq!(json["session_id"], first.session_id.as_str());
    assert_eq!(json["response"]["type"], "complete");
    assert_eq!(json["response"]["email_sent"], false);
    assert_eq!(json["response"]["package"]["total_price"]["currency"], "EUR");
    assert!(json["response"]["package"]["total_price"]["amount"].as_f64().unwrap() <= 500.0);
}

#[tokio::test]
async fn test_without_mailer_email_not_sent() {
    let app = make_app();
    let chat = chat(
        &app,
        "from Porto to London tomorrow for 2 days, my email is jane@example.com",
        None,
    )
    .await;
    assert_eq!(chat.response.kind, ReplyKind::Complete);
    assert_eq!(chat.response.email_sent, Some(false));
    assert!(chat.response.message.contains("couldn't email"));
}

#[tokio::test]
async fn test_incomplete_request_never_completes() {
    let app = make_app();
    let first = chat(&app, "from Porto to London", None).await;
    let second = chat(&app, "next weekend please", Some(&first.session_id)).await;
    assert_eq!(second.response.kind, ReplyKind::Question);
    assert!(second.response.package.is_none());
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_session_snapshot_tracks_fields() {
    let app = make_app();
    let first = chat(&app, PORTO_LONDON, None).await;

    let (status, json) = snapshot(&app, &first.session_id).await;
    assert_eq!(status, StatusCode::OK);
    let snap: SessionSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(snap.phase, SessionPhase::Collecting);
    assert_eq!(snap.turns, 1);
    assert_eq!(snap.request.origin.as_deref(), Some("Porto"));
    assert_eq!(snap.missing_fields, vec!["traveler_email".to_string()]);
    assert_eq!(snap.history.len(), 2);
}

#[tokio::test]
async fn test_delete_then_reuse_id_starts_fresh() {
    let app = make_app();
    let first = chat(&app, PORTO_LONDON, None).await;

    let resp = app
        .clone()
        .oneshot(
            Request::delete(format!("/session/{}", first.session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared: ClearSessionResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(cleared.existed);
    assert_eq!(cleared.session_id, first.session_id);

    let (status, _) = snapshot(&app, &first.session_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The old id carries nothing over; the email alone is not enough.
    let reused = chat(&app, "jane@example.com", Some(&first.session_id)).await;
    assert_eq!(reused.response.kind, ReplyKind::Question);
    assert_ne!(reused.session_id, first.session_id);

    let (_, json) = snapshot(&app, &reused.session_id).await;
    assert!(json["request"]["origin"].is_null());
    assert!(json["request"]["destination"].is_null());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let app = make_app();
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(
                Request::delete("/session/unknown-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Session cleared");
        assert_eq!(json["existed"], false);
    }
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_empty_message_is_bad_request() {
    let app = make_app();
    let resp = app.oneshot(chat_request("", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["message"], "message cannot be empty");
}

#[tokio::test]
async fn test_over_long_message_is_bad_request() {
    let app = make_app();
    let long = "x".repeat(2001);
    let resp = app.oneshot(chat_request(&long, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rejected_message_creates_no_session() {
    let app = make_app();
    let resp = app.clone().oneshot(chat_request("  ", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(health.active_sessions, 0);
}

// =============================================================================
// Health and status
// =============================================================================

#[tokio::test]
async fn test_health_reports_sessions_and_warnings() {
    let app = make_app();
    chat(&app, "from Porto to London", None).await;
    chat(&app, "from Madrid to Rome", None).await;

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_sessions, 2);
    assert!(health.warnings[0].contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn test_config_status_reflects_capabilities() {
    let capabilities = CapabilityFlags {
        language_model: true,
        search: false,
        email: true,
    };
    let app = make_app_with(Arc::new(DisabledMailer), capabilities);
    let resp = app
        .oneshot(Request::get("/config/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["language_model"], true);
    assert_eq!(json["search"], false);
    assert_eq!(json["email"], true);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = make_app();
    let resp = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
