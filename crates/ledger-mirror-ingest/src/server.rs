// crates/ledger-mirror-ingest/src/server.rs
// ============================================================================
// Module: Ingest HTTP Server
// Description: HTTP boundary for telemetry event submission.
// Purpose: Map pipeline outcomes onto status codes and audit every request.
// Dependencies: ledger-mirror-core, axum, serde_json, tokio
// ============================================================================

//! ## Overview
//! Two routes: `POST /observability/events` accepts telemetry through the
//! validation pipeline, and `GET /observability/events` exposes the buffer
//! tail for diagnostics. Rate limiting is keyed per client, derived from the
//! first `X-Forwarded-For` entry or the peer address. The diagnostic route is
//! visible only in restricted (development) mode; production answers 404 so
//! the surface is not discoverable. Submission outcomes map onto 415, 429,
//! 413, 400, and 202, and every response carries the request id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use ledger_mirror_core::AuditEvent;
use ledger_mirror_core::AuditSink;
use ledger_mirror_core::RuntimeMode;
use ledger_mirror_core::ensure_debug_allowed;

use crate::pipeline::IngestPipeline;
use crate::pipeline::RejectReason;
use crate::request_id::RequestIdGenerator;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// HTTP server settings for the ingest boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestServerConfig {
    /// Bind address, e.g. `127.0.0.1:8081`.
    pub bind: String,
}

/// Ingest server errors.
#[derive(Debug, Error)]
pub enum IngestServerError {
    /// Bind address could not be parsed.
    #[error("invalid bind address: {0}")]
    Config(String),
    /// Listener or server failure.
    #[error("ingest transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state behind the ingest routes.
pub struct IngestState {
    /// Validation pipeline and event buffer.
    pipeline: IngestPipeline,
    /// Runtime mode resolved at startup.
    mode: RuntimeMode,
    /// Request identifier generator.
    request_ids: RequestIdGenerator,
    /// Audit sink for request outcomes.
    audit: Arc<dyn AuditSink>,
}

impl IngestState {
    /// Creates the server state.
    pub fn new(pipeline: IngestPipeline, mode: RuntimeMode, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            pipeline,
            mode,
            request_ids: RequestIdGenerator::new("evt"),
            audit,
        }
    }

    /// Returns the pipeline behind this state.
    #[must_use]
    pub const fn pipeline(&self) -> &IngestPipeline {
        &self.pipeline
    }
}

/// Builds the ingest router over shared state.
pub fn ingest_router(state: Arc<IngestState>) -> Router {
    Router::new()
        .route("/observability/events", post(handle_submit).get(handle_inspect))
        .with_state(state)
}

/// Serves the ingest boundary until the process exits.
///
/// # Errors
///
/// Returns [`IngestServerError`] when the bind address is invalid or the
/// listener fails.
pub async fn serve(
    config: &IngestServerConfig,
    state: Arc<IngestState>,
) -> Result<(), IngestServerError> {
    let addr: SocketAddr = config
        .bind
        .parse()
        .map_err(|_| IngestServerError::Config(config.bind.clone()))?;
    let app = ingest_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| IngestServerError::Transport("ingest bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| IngestServerError::Transport("ingest server failed".to_string()))
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles telemetry submission.
async fn handle_submit(
    State(state): State<Arc<IngestState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = state.request_ids.issue();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let client = client_key(&headers, peer);
    match state.pipeline.submit(content_type, &client, &body, &request_id) {
        Ok(stored) => {
            state.audit.record(&AuditEvent::now(
                "ingest_accepted",
                Some(request_id.clone()),
                json!({ "client": client, "stored": stored }),
            ));
            (
                StatusCode::ACCEPTED,
                Json(json!({ "status": "accepted", "requestId": request_id })),
            )
        }
        Err(reason) => {
            state.audit.record(&AuditEvent::now(
                "ingest_rejected",
                Some(request_id.clone()),
                json!({ "client": client, "reason": reason.label() }),
            ));
            (reject_status(&reason), Json(reject_body(&reason, &request_id)))
        }
    }
}

/// Handles buffer inspection; hidden outside restricted mode.
async fn handle_inspect(State(state): State<Arc<IngestState>>) -> impl IntoResponse {
    if ensure_debug_allowed(state.mode).is_err() {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "not found" })));
    }
    let events = state.pipeline.buffer().tail(100);
    let total = state.pipeline.buffer().len();
    (
        StatusCode::OK,
        Json(json!({ "buffered": total, "events": events })),
    )
}

/// Derives the rate-limit client key from headers or the peer address.
fn client_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map_or_else(|| peer.ip().to_string(), str::to_string)
}

/// Maps a rejection onto its status code.
const fn reject_status(reason: &RejectReason) -> StatusCode {
    match reason {
        RejectReason::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        RejectReason::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        RejectReason::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        RejectReason::Malformed(_) => StatusCode::BAD_REQUEST,
    }
}

/// Builds the rejection response body.
fn reject_body(reason: &RejectReason, request_id: &str) -> Value {
    let detail = match reason {
        RejectReason::Malformed(detail) => detail.clone(),
        other => other.label().to_string(),
    };
    json!({ "detail": detail, "requestId": request_id })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Panic-based assertions are permitted in tests."
    )]

    use axum::http::HeaderValue;
    use ledger_mirror_core::NoopAuditSink;
    use serde_json::json;

    use crate::pipeline::MAX_EVENT_BODY_BYTES;
    use crate::pipeline::RATE_LIMIT_MAX_REQUESTS;

    use super::*;

    fn state_in(mode: RuntimeMode) -> Arc<IngestState> {
        Arc::new(IngestState::new(IngestPipeline::new(), mode, Arc::new(NoopAuditSink)))
    }

    fn peer(port: u16) -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn event_bytes() -> Bytes {
        Bytes::from(
            json!({
                "type": "page_load",
                "level": "info",
                "timestamp": "2026-08-27T10:00:00Z",
                "context": { "route": "/home" },
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn valid_submissions_are_accepted() {
        let state = state_in(RuntimeMode::Restricted);
        let response = handle_submit(State(state.clone()), peer(4001), json_headers(), event_bytes())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(state.pipeline().buffer().len(), 1);
    }

    #[tokio::test]
    async fn wrong_media_types_get_415() {
        let state = state_in(RuntimeMode::Restricted);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let response = handle_submit(State(state), peer(4002), headers, event_bytes())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn malformed_bodies_get_400() {
        let state = state_in(RuntimeMode::Restricted);
        let response =
            handle_submit(State(state), peer(4003), json_headers(), Bytes::from_static(b"{"))
                .await
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_bodies_get_413() {
        let state = state_in(RuntimeMode::Restricted);
        let oversized = Bytes::from(vec![b' '; MAX_EVENT_BODY_BYTES + 1]);
        let response = handle_submit(State(state), peer(4004), json_headers(), oversized)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn the_rate_window_returns_429_past_the_limit() {
        let state = state_in(RuntimeMode::Restricted);
        for _ in 0..RATE_LIMIT_MAX_REQUESTS {
            let response =
                handle_submit(State(state.clone()), peer(4005), json_headers(), event_bytes())
                    .await
                    .into_response();
            assert_eq!(response.status(), StatusCode::ACCEPTED);
        }
        let response = handle_submit(State(state), peer(4005), json_headers(), event_bytes())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn forwarded_for_headers_separate_clients() {
        let state = state_in(RuntimeMode::Restricted);
        let mut noisy = json_headers();
        noisy.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.9.9.9"));
        for _ in 0..RATE_LIMIT_MAX_REQUESTS {
            handle_submit(State(state.clone()), peer(4006), noisy.clone(), event_bytes()).await;
        }
        let response = handle_submit(State(state.clone()), peer(4006), noisy, event_bytes())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // Same peer, different forwarded client: not throttled.
        let mut quiet = json_headers();
        quiet.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.2"));
        let response = handle_submit(State(state), peer(4006), quiet, event_bytes())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn inspection_is_open_in_restricted_mode() {
        let state = state_in(RuntimeMode::Restricted);
        handle_submit(State(state.clone()), peer(4007), json_headers(), event_bytes()).await;
        let response = handle_inspect(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn inspection_is_hidden_in_production() {
        let state = state_in(RuntimeMode::Unrestricted);
        let response = handle_inspect(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
