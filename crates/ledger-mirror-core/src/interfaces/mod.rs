// crates/ledger-mirror-core/src/interfaces/mod.rs
// ============================================================================
// Module: Ledger Mirror Interfaces
// Description: Backend-agnostic interfaces for gateways, caches, and stores.
// Purpose: Define the contract surfaces used by the reconciliation runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the core integrates with the remote accounting
//! service, the cache layer, and the local mirror store without embedding
//! backend-specific details. Implementations must fail closed: a transport
//! failure is an error, never silently treated as an empty result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::EntityType;
use crate::core::MirrorRecord;
use crate::core::SyncOperation;
use crate::core::SyncStatus;

// ============================================================================
// SECTION: Remote Gateway
// ============================================================================

/// Token lifecycle errors.
///
/// Token failures are fatal for the issuing request: without a credential no
/// outbound call can be made.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token endpoint returned an error status.
    #[error("token endpoint error {status}: {body}")]
    Endpoint {
        /// HTTP status code returned by the token endpoint.
        status: u16,
        /// Truncated response body for diagnostics.
        body: String,
    },
    /// Token endpoint response had no usable `access_token`.
    #[error("token endpoint response missing access_token")]
    MissingAccessToken,
    /// Token endpoint response had no positive integer `expires_in`.
    #[error("token endpoint response missing valid expires_in")]
    InvalidExpiry,
    /// Transport-level failure reaching the token endpoint.
    #[error("token endpoint transport error: {0}")]
    Transport(String),
    /// HTTP client construction failed.
    #[error("http client build failed")]
    ClientBuild,
}

/// Errors raised by outbound calls to the remote accounting service.
#[derive(Debug, Error)]
pub enum RemoteServiceError {
    /// Network-level failure (connect, timeout, TLS).
    #[error("remote transport error: {0}")]
    Transport(String),
    /// Remote returned an error status.
    #[error("remote error {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body for diagnostics.
        body: String,
    },
    /// Remote list response was neither a bare array nor an items envelope.
    #[error("unexpected list shape for {label}")]
    UnexpectedShape {
        /// Resource label for diagnostics.
        label: String,
    },
    /// No credential could be obtained for the call.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Operation is not supported for this resource type.
    #[error("operation not supported for {resource}")]
    Unsupported {
        /// Resource label for diagnostics.
        resource: String,
    },
}

/// Backend-agnostic gateway over one remote resource type.
///
/// Implementations own caching and fallback strategy; callers see only the
/// resulting items. Items are opaque JSON documents.
pub trait ResourceGateway: Send + Sync {
    /// Stable resource label for diagnostics and audit events.
    fn resource_label(&self) -> &str;

    /// Extracts the remote identifier from an item, trying the resource's
    /// known id-field aliases in order.
    fn external_id_of(&self, item: &Value) -> Option<String>;

    /// Lists all items of this resource type.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] when the remote call fails.
    fn list(&self) -> Result<Vec<Value>, RemoteServiceError>;

    /// Fetches one item by remote identifier; `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] when the remote call fails in a way the
    /// fallback strategy cannot absorb.
    fn get(&self, id: i64) -> Result<Option<Value>, RemoteServiceError>;

    /// Creates an item remotely and returns the remote document.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] when the remote call fails.
    fn create(&self, data: &Value) -> Result<Value, RemoteServiceError>;

    /// Replaces an item remotely; `None` when the remote reports it absent.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] when the remote call fails.
    fn update(&self, id: i64, data: &Value) -> Result<Option<Value>, RemoteServiceError>;

    /// Partially updates an item remotely; `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] when the remote call fails.
    fn patch(&self, id: i64, data: &Value) -> Result<Option<Value>, RemoteServiceError>;

    /// Deletes an item remotely; `false` when the remote reports it absent.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteServiceError`] when the remote call fails.
    fn delete(&self, id: i64) -> Result<bool, RemoteServiceError>;
}

// ============================================================================
// SECTION: Cache Provider
// ============================================================================

/// Cache backend errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache backend reported an error.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Read-through key/value cache with per-call TTL semantics.
///
/// # Invariants
/// - An entry older than the supplied TTL is treated as absent and purged on
///   the read that discovers it.
/// - `ttl_seconds == 0` disables caching for the call: `get` always misses
///   and `set` is a no-op.
/// - Values are owned copies in both directions; mutating a returned value
///   never affects the cached copy.
pub trait CacheProvider: Send + Sync {
    /// Returns the cached value for `key` when present and fresh.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend fails. A corrupt entry is
    /// dropped and reported as a miss, not an error.
    fn get(&self, key: &str, ttl_seconds: u64) -> Result<Option<Value>, CacheError>;

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend fails.
    fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), CacheError>;

    /// Removes the entry for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend fails.
    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every entry owned by this provider.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend fails.
    fn clear(&self) -> Result<(), CacheError>;
}

// ============================================================================
// SECTION: Mirror Store
// ============================================================================

/// Mirror store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O or query failure.
    #[error("store backend error: {0}")]
    Backend(String),
    /// Referenced record does not exist.
    #[error("record {0} not found")]
    RecordNotFound(u64),
    /// Stored row could not be decoded into a record.
    #[error("stored record corrupt: {0}")]
    Corrupt(String),
}

/// Draft record handed to [`MirrorStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMirrorRecord {
    /// Entity class this record mirrors.
    pub entity_type: EntityType,
    /// Operation pending against the remote system.
    pub operation: SyncOperation,
    /// Remote identifier, when already known.
    pub external_id: Option<String>,
    /// Opaque entity document.
    pub payload: Value,
    /// Initial sync status.
    pub status: SyncStatus,
}

/// Filter for [`MirrorStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    /// Entity class to select.
    pub entity_type: EntityType,
    /// Optional status restriction.
    pub status: Option<SyncStatus>,
    /// Maximum records returned.
    pub limit: usize,
    /// Records skipped before the first returned.
    pub offset: usize,
}

/// Persistence contract for mirror records.
///
/// The concrete storage engine is an external collaborator; the engine only
/// relies on this minimal surface.
pub trait MirrorStore: Send + Sync {
    /// Persists a new record and returns it with identity and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    fn create(&self, draft: NewMirrorRecord) -> Result<MirrorRecord, StoreError>;

    /// Replaces the stored record matching `record.record_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] when no such record exists.
    fn update(&self, record: &MirrorRecord) -> Result<MirrorRecord, StoreError>;

    /// Looks up a record by entity type and remote identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn get_by_external_id(
        &self,
        entity_type: &EntityType,
        external_id: &str,
    ) -> Result<Option<MirrorRecord>, StoreError>;

    /// Deletes a record by local identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] when no such record exists.
    fn delete(&self, record_id: u64) -> Result<(), StoreError>;

    /// Lists records matching the filter, ordered by local identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn list(&self, filter: &RecordFilter) -> Result<Vec<MirrorRecord>, StoreError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Structured audit event emitted by gateways, the engine, and the ingest
/// boundary.
///
/// # Invariants
/// - `detail` never contains credentials or raw tokens.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Stable event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when the event belongs to one request.
    pub request_id: Option<String>,
    /// Event-specific fields.
    pub detail: Value,
}

impl AuditEvent {
    /// Builds an event stamped with the current wall-clock time.
    #[must_use]
    pub fn now(event: &'static str, request_id: Option<String>, detail: Value) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or(0);
        Self {
            event,
            timestamp_ms,
            request_id,
            detail,
        }
    }
}

/// Audit sink for structured events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink writing JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is this sink's delivery channel.")]
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}
