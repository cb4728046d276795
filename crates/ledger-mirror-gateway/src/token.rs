// crates/ledger-mirror-gateway/src/token.rs
// ============================================================================
// Module: Token Lifecycle Manager
// Description: OAuth2 client-credential acquisition and caching.
// Purpose: Hand out fresh bearer tokens and recover from remote invalidation.
// Dependencies: ledger-mirror-core, reqwest, base64, serde_json
// ============================================================================

//! ## Overview
//! The manager owns the cached [`Credential`] behind a mutex, so concurrent
//! callers needing a refresh serialize on one token request instead of racing
//! the endpoint. Freshness is judged with a ten-second leeway at hand-out
//! time; the remote can still reject a token early, which callers surface via
//! [`is_invalid_token_response`] to force exactly one refresh-and-retry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde_json::Value;
use serde_json::json;

use ledger_mirror_core::AuditEvent;
use ledger_mirror_core::AuditSink;
use ledger_mirror_core::Clock;
use ledger_mirror_core::Credential;
use ledger_mirror_core::TokenError;

use crate::http::RemoteConfig;
use crate::status::TokenStatus;
use crate::status::token_preview;

// ============================================================================
// SECTION: Invalid Token Detection
// ============================================================================

/// Returns true when a response is the remote's invalid-token marker.
///
/// The remote reports a revoked or prematurely expired token as a 401 whose
/// JSON body carries `"error": "invalid_token"`; any other 401 is a plain
/// authorization failure and must not trigger a refresh loop.
#[must_use]
pub fn is_invalid_token_response(status: u16, body: &str) -> bool {
    if status != 401 {
        return false;
    }
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .is_some_and(|error| error == "invalid_token")
}

// ============================================================================
// SECTION: Token Manager
// ============================================================================

/// OAuth2 client-credential token manager.
///
/// # Invariants
/// - The cached credential is replaced wholesale, never mutated in place.
/// - Audit events carry at most a redacted token preview, never the token.
pub struct TokenManager {
    /// HTTP client for token endpoint calls.
    http: Client,
    /// Token endpoint URL.
    endpoint: String,
    /// OAuth2 client identifier.
    client_id: String,
    /// OAuth2 client secret.
    client_secret: String,
    /// Clock used for expiry decisions.
    clock: Arc<dyn Clock>,
    /// Cached credential, if any.
    cached: Mutex<Option<Credential>>,
    /// Audit sink for lifecycle events.
    audit: Arc<dyn AuditSink>,
}

impl TokenManager {
    /// Creates a manager for the configured remote.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::ClientBuild`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: &RemoteConfig,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, TokenError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|_| TokenError::ClientBuild)?;
        Ok(Self {
            http,
            endpoint: config.token_endpoint.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            clock,
            cached: Mutex::new(None),
            audit,
        })
    }

    /// Returns a bearer token, refreshing when the cached one is stale.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when no fresh credential can be obtained.
    pub fn bearer(&self) -> Result<String, TokenError> {
        let now = self.clock.now();
        let mut guard = self
            .cached
            .lock()
            .map_err(|_| TokenError::Transport("token cache mutex poisoned".to_string()))?;
        if let Some(credential) = guard.as_ref()
            && credential.is_fresh(now)
        {
            return Ok(credential.access_token.clone());
        }
        let refreshed = self.request_credential()?;
        let token = refreshed.access_token.clone();
        self.audit.record(&AuditEvent::now(
            "token_refreshed",
            None,
            json!({
                "token_preview": token_preview(&token),
                "expires_in_seconds": refreshed.seconds_remaining(now),
            }),
        ));
        *guard = Some(refreshed);
        Ok(token)
    }

    /// Discards the cached credential so the next call refreshes.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = None;
        }
        self.audit.record(&AuditEvent::now("token_invalidated", None, json!({})));
    }

    /// Forces a refresh, discarding any cached credential first.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when no fresh credential can be obtained.
    pub fn refresh(&self) -> Result<String, TokenError> {
        self.invalidate();
        self.bearer()
    }

    /// Returns a redacted summary of the cached credential, if any.
    #[must_use]
    pub fn status(&self) -> Option<TokenStatus> {
        let now = self.clock.now();
        self.cached.lock().ok().and_then(|guard| {
            guard.as_ref().map(|credential| TokenStatus {
                token_preview: token_preview(&credential.access_token),
                seconds_remaining: credential.seconds_remaining(now),
            })
        })
    }

    /// Requests a new credential from the token endpoint.
    fn request_credential(&self) -> Result<Credential, TokenError> {
        let basic = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Basic {basic}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|err| TokenError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| TokenError::Transport(err.to_string()))?;
        if status >= 400 {
            return Err(TokenError::Endpoint {
                status,
                body: truncate_body(&body),
            });
        }

        let document: Value = serde_json::from_str(&body)
            .map_err(|err| TokenError::Transport(format!("token response not json: {err}")))?;
        let access_token = document
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or(TokenError::MissingAccessToken)?
            .to_string();
        let expires_in = document
            .get("expires_in")
            .and_then(Value::as_i64)
            .filter(|seconds| *seconds > 0)
            .ok_or(TokenError::InvalidExpiry)?;

        Ok(Credential {
            access_token,
            token_type: document.get("token_type").and_then(Value::as_str).map(str::to_string),
            scope: document.get("scope").and_then(Value::as_str).map(str::to_string),
            expires_at: self.clock.now().saturating_add_seconds(expires_in),
        })
    }
}

/// Caps diagnostic bodies at a sane size.
fn truncate_body(body: &str) -> String {
    const MAX_DIAGNOSTIC_BYTES: usize = 512;
    if body.len() <= MAX_DIAGNOSTIC_BYTES {
        return body.to_string();
    }
    let mut end = MAX_DIAGNOSTIC_BYTES;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
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

    use super::*;

    #[test]
    fn invalid_token_marker_requires_401_and_error_field() {
        assert!(is_invalid_token_response(401, r#"{"error": "invalid_token"}"#));
        assert!(!is_invalid_token_response(401, r#"{"error": "access_denied"}"#));
        assert!(!is_invalid_token_response(401, "not json"));
        assert!(!is_invalid_token_response(403, r#"{"error": "invalid_token"}"#));
    }

    #[test]
    fn diagnostic_bodies_are_truncated_on_char_boundaries() {
        let long = "é".repeat(600);
        let truncated = truncate_body(&long);
        assert!(truncated.len() <= 512);
        assert!(truncated.chars().all(|ch| ch == 'é'));
    }
}
