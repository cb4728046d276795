// crates/ledger-mirror-gateway/src/http.rs
// ============================================================================
// Module: Remote HTTP Client
// Description: Bounded HTTP client for the remote accounting API.
// Purpose: Issue authenticated requests with single-retry token recovery.
// Dependencies: ledger-mirror-core, reqwest, serde_json, crate::{status, token}
// ============================================================================

//! ## Overview
//! Every outbound call attaches a bearer token from the [`TokenManager`].
//! When the remote answers with its invalid-token marker, the cached
//! credential is discarded and the request is retried exactly once with a
//! fresh token; a second rejection is a hard failure. Response bodies are
//! read under a hard byte limit so a misbehaving remote cannot exhaust
//! memory, and redirects are never followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;

use ledger_mirror_core::PolicyError;
use ledger_mirror_core::RemoteServiceError;
use ledger_mirror_core::RuntimeMode;
use ledger_mirror_core::ensure_debug_allowed;

use crate::status::GatewayStatus;
use crate::token::TokenManager;
use crate::token::is_invalid_token_response;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings for the remote accounting service.
///
/// # Invariants
/// - `timeout_ms` applies to the full request lifecycle.
/// - `max_response_bytes` is a hard upper bound on response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote API, without a trailing slash.
    pub base_url: String,
    /// OAuth2 token endpoint URL.
    pub token_endpoint: String,
    /// OAuth2 client identifier.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token_endpoint: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_ms: 15_000,
            max_response_bytes: 4 * 1024 * 1024,
            user_agent: "ledger-mirror/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Remote Client
// ============================================================================

/// Authenticated HTTP client over the remote API.
pub struct RemoteHttpClient {
    /// Underlying HTTP client.
    client: Client,
    /// Base URL of the remote API.
    base_url: String,
    /// Token lifecycle manager.
    tokens: Arc<TokenManager>,
    /// Hard response body limit, in bytes.
    max_response_bytes: usize,
    /// Whether base URL and credentials were all present at construction.
    configured: bool,
}

impl RemoteHttpClient {
    /// Creates a client for the configured remote.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] when the HTTP client cannot be built.
    pub fn new(config: &RemoteConfig, tokens: Arc<TokenManager>) -> Result<Self, RemoteServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| RemoteServiceError::Transport("http client build failed".to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
            max_response_bytes: config.max_response_bytes,
            configured: !config.base_url.is_empty()
                && !config.client_id.is_empty()
                && !config.client_secret.is_empty(),
        })
    }

    /// Returns the redacted connection status for diagnostic surfaces.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NotFound`] when the runtime mode hides
    /// diagnostics.
    pub fn status(&self, mode: RuntimeMode) -> Result<GatewayStatus, PolicyError> {
        ensure_debug_allowed(mode)?;
        Ok(GatewayStatus {
            configured: self.configured,
            mode,
            token: self.tokens.status(),
            base_url: self.base_url.clone(),
        })
    }

    /// Fetches a JSON document; `None` when the remote answers 404.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] on transport failure or error status.
    pub fn get_json(&self, path: &str) -> Result<Option<Value>, RemoteServiceError> {
        match self.send(Method::GET, path, None)? {
            Outcome::Document(value) => Ok(Some(value)),
            Outcome::Absent => Ok(None),
        }
    }

    /// Posts a JSON document and returns the remote's response document.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] on transport failure or error status; a
    /// 404 on a POST is an error, not an absence.
    pub fn post_json(&self, path: &str, body: &Value) -> Result<Value, RemoteServiceError> {
        match self.send(Method::POST, path, Some(body))? {
            Outcome::Document(value) => Ok(value),
            Outcome::Absent => Err(RemoteServiceError::Status {
                status: 404,
                body: String::new(),
            }),
        }
    }

    /// Replaces a JSON document; `None` when the remote answers 404.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] on transport failure or error status.
    pub fn put_json(&self, path: &str, body: &Value) -> Result<Option<Value>, RemoteServiceError> {
        match self.send(Method::PUT, path, Some(body))? {
            Outcome::Document(value) => Ok(Some(value)),
            Outcome::Absent => Ok(None),
        }
    }

    /// Partially updates a JSON document; `None` when the remote answers 404.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] on transport failure or error status.
    pub fn patch_json(&self, path: &str, body: &Value) -> Result<Option<Value>, RemoteServiceError> {
        match self.send(Method::PATCH, path, Some(body))? {
            Outcome::Document(value) => Ok(Some(value)),
            Outcome::Absent => Ok(None),
        }
    }

    /// Deletes a resource; `false` when the remote answers 404.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] on transport failure or error status.
    pub fn delete(&self, path: &str) -> Result<bool, RemoteServiceError> {
        match self.send(Method::DELETE, path, None)? {
            Outcome::Document(_) => Ok(true),
            Outcome::Absent => Ok(false),
        }
    }

    /// Sends one request with single-retry invalid-token recovery.
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Outcome, RemoteServiceError> {
        match self.send_once(method.clone(), path, body)? {
            Reply::Settled(outcome) => Ok(outcome),
            Reply::InvalidToken => {
                self.tokens.invalidate();
                match self.send_once(method, path, body)? {
                    Reply::Settled(outcome) => Ok(outcome),
                    Reply::InvalidToken => Err(RemoteServiceError::Status {
                        status: 401,
                        body: "token rejected after refresh".to_string(),
                    }),
                }
            }
        }
    }

    /// Sends one request and classifies the response.
    fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Reply, RemoteServiceError> {
        let token = self.tokens.bearer()?;
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .map_err(|err| RemoteServiceError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let raw = read_response_limited(response, self.max_response_bytes)?;
        let text = String::from_utf8_lossy(&raw).into_owned();

        if is_invalid_token_response(status, &text) {
            return Ok(Reply::InvalidToken);
        }
        if status == 404 {
            return Ok(Reply::Settled(Outcome::Absent));
        }
        if status >= 400 {
            return Err(RemoteServiceError::Status {
                status,
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Reply::Settled(Outcome::Document(Value::Null)));
        }
        let document = serde_json::from_str(&text)
            .map_err(|err| RemoteServiceError::Transport(format!("response not json: {err}")))?;
        Ok(Reply::Settled(Outcome::Document(document)))
    }
}

/// Result of a classified request, before token-retry handling.
enum Reply {
    /// Response settled into a final outcome.
    Settled(Outcome),
    /// Remote rejected the bearer token; eligible for one retry.
    InvalidToken,
}

/// Final classification of a remote response.
enum Outcome {
    /// Remote returned a document (possibly `null` for empty bodies).
    Document(Value),
    /// Remote reported the resource absent.
    Absent,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a response body while enforcing a byte limit.
fn read_response_limited(
    response: Response,
    max_bytes: usize,
) -> Result<Vec<u8>, RemoteServiceError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| RemoteServiceError::Transport("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(RemoteServiceError::Transport("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|_| RemoteServiceError::Transport("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(RemoteServiceError::Transport("response exceeds size limit".to_string()));
    }
    Ok(buf)
}

/// Extracts the item array from a list response.
///
/// The remote answers list calls either with a bare JSON array or with an
/// envelope object carrying an `items` array.
///
/// # Errors
///
/// Returns [`RemoteServiceError::UnexpectedShape`] for any other shape.
pub fn extract_list(document: Value, label: &str) -> Result<Vec<Value>, RemoteServiceError> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(RemoteServiceError::UnexpectedShape {
                label: label.to_string(),
            }),
        },
        _ => Err(RemoteServiceError::UnexpectedShape {
            label: label.to_string(),
        }),
    }
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

    use serde_json::json;

    use super::*;

    #[test]
    fn list_extraction_accepts_bare_arrays() {
        let items = extract_list(json!([1, 2, 3]), "product").unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn list_extraction_accepts_items_envelopes() {
        let items = extract_list(json!({ "items": [{ "id": 1 }], "total": 1 }), "product").unwrap();
        assert_eq!(items, vec![json!({ "id": 1 })]);
    }

    #[test]
    fn list_extraction_rejects_other_shapes() {
        assert!(extract_list(json!({ "data": [] }), "product").is_err());
        assert!(extract_list(json!("nope"), "product").is_err());
        assert!(extract_list(json!(42), "product").is_err());
    }
}
