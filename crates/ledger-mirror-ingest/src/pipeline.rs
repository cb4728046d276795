// crates/ledger-mirror-ingest/src/pipeline.rs
// ============================================================================
// Module: Ingestion Pipeline
// Description: Validation, rate limiting, and buffering for telemetry events.
// Purpose: Fail closed on untrusted input before anything is stored.
// Dependencies: ledger-mirror-core, serde, serde_json, time
// ============================================================================

//! ## Overview
//! The pipeline runs the checks in boundary order: media type, rate limit,
//! body size, then shape. Rate limiting is a per-client sliding window, and
//! every arrival past the media check counts against it, even arrivals that
//! are later rejected, so a client cannot probe for free. Event timestamps
//! must be UTC ISO-8601. Oversized stack traces are truncated rather than
//! rejected; the event is still worth keeping. Accepted events land in a
//! bounded ring buffer that evicts oldest-first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use ledger_mirror_core::Clock;
use ledger_mirror_core::SystemClock;
use ledger_mirror_core::Timestamp;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum accepted request body size, in bytes.
pub const MAX_EVENT_BODY_BYTES: usize = 32 * 1024;

/// Maximum stored stack trace size, in bytes; longer stacks are truncated.
pub const MAX_STACK_BYTES: usize = 8 * 1024;

/// Default maximum requests accepted per client per rate window.
pub const RATE_LIMIT_MAX_REQUESTS: usize = 120;

/// Default rate window length, in seconds.
pub const RATE_LIMIT_WINDOW_SECONDS: i64 = 60;

/// Default maximum events retained in the ring buffer.
pub const MAX_BUFFERED_EVENTS: usize = 20_000;

/// Event types the pipeline accepts.
pub const ALLOWED_EVENT_TYPES: &[&str] =
    &["http_request", "route_navigation", "page_load", "frontend_error"];

/// Severity levels the pipeline accepts.
pub const ALLOWED_LEVELS: &[&str] = &["info", "warn", "error"];

/// Tunable pipeline limits; defaults match the constants above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestLimits {
    /// Maximum accepted request body size, in bytes.
    pub max_body_bytes: usize,
    /// Maximum requests accepted per client per rate window.
    pub max_requests: usize,
    /// Rate window length, in seconds.
    pub window_seconds: i64,
    /// Maximum events retained in the ring buffer.
    pub buffer_capacity: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: MAX_EVENT_BODY_BYTES,
            max_requests: RATE_LIMIT_MAX_REQUESTS,
            window_seconds: RATE_LIMIT_WINDOW_SECONDS,
            buffer_capacity: MAX_BUFFERED_EVENTS,
        }
    }
}

// ============================================================================
// SECTION: Rejection
// ============================================================================

/// Why a request was refused at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Content type was not JSON.
    UnsupportedMediaType,
    /// Client exceeded the rate window.
    RateLimited,
    /// Body exceeded the size cap.
    PayloadTooLarge,
    /// Body failed to parse or validate.
    Malformed(String),
}

impl RejectReason {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::RateLimited => "rate_limited",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Malformed(_) => "malformed",
        }
    }
}

// ============================================================================
// SECTION: Observed Event
// ============================================================================

/// One validated telemetry event as stored in the buffer.
#[derive(Debug, Clone, Serialize)]
pub struct ObservedEvent {
    /// Pipeline-assigned identifier, increasing in acceptance order.
    pub id: u64,
    /// Event type label.
    pub event_type: String,
    /// Severity level label.
    pub level: String,
    /// Client-reported UTC ISO-8601 timestamp, kept verbatim.
    pub event_timestamp: String,
    /// Event context document; stack traces inside are truncated.
    pub context: Map<String, Value>,
    /// Server-issued request identifier this event arrived under.
    pub request_id: String,
    /// Arrival instant.
    pub received_at: Timestamp,
}

// ============================================================================
// SECTION: Rate Limiter
// ============================================================================

/// Per-client sliding-window arrival counter.
///
/// # Invariants
/// - Every arrival is recorded, including arrivals that are rejected, so
///   rejected traffic still consumes quota.
/// - Clients idle for two full windows are swept on the next registration.
pub struct RateLimiter {
    /// Arrival instants per client inside the current window.
    clients: Mutex<HashMap<String, VecDeque<Timestamp>>>,
    /// Maximum arrivals per client per window.
    max_requests: usize,
    /// Window length in seconds.
    window_seconds: i64,
}

impl RateLimiter {
    /// Creates a limiter with the given window shape.
    #[must_use]
    pub fn new(max_requests: usize, window_seconds: i64) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            max_requests,
            window_seconds,
        }
    }

    /// Records one arrival; returns false when the client is over quota.
    pub fn register(&self, client_key: &str, now: Timestamp) -> bool {
        let Ok(mut clients) = self.clients.lock() else {
            // Poisoned limiter fails closed.
            return false;
        };
        let stale_after = self.window_seconds.saturating_mul(2);
        clients.retain(|_, arrivals| {
            arrivals.back().is_some_and(|last| now.seconds_since(*last) < stale_after)
        });
        let arrivals = clients.entry(client_key.to_string()).or_default();
        while let Some(oldest) = arrivals.front() {
            if now.seconds_since(*oldest) < self.window_seconds {
                break;
            }
            arrivals.pop_front();
        }
        arrivals.push_back(now);
        arrivals.len() <= self.max_requests
    }
}

// ============================================================================
// SECTION: Event Buffer
// ============================================================================

/// Bounded ring buffer of accepted events.
pub struct EventBuffer {
    /// Stored events, oldest first.
    events: Mutex<VecDeque<ObservedEvent>>,
    /// Maximum retained events.
    capacity: usize,
}

impl EventBuffer {
    /// Creates a buffer with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Appends an event, evicting the oldest when full.
    pub fn push(&self, event: ObservedEvent) {
        let Ok(mut events) = self.events.lock() else {
            return;
        };
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Returns the number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    /// Returns true when the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the newest `limit` events, oldest first.
    #[must_use]
    pub fn tail(&self, limit: usize) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .map(|events| {
                let skip = events.len().saturating_sub(limit);
                events.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Validation pipeline in front of the event buffer.
pub struct IngestPipeline {
    /// Per-client rate limiter.
    limiter: RateLimiter,
    /// Accepted-event ring buffer.
    buffer: EventBuffer,
    /// Next identifier handed to an accepted event.
    next_event_id: AtomicU64,
    /// Body size cap, in bytes.
    max_body_bytes: usize,
    /// Clock for arrival stamps and windowing.
    clock: Arc<dyn Clock>,
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestPipeline {
    /// Creates a pipeline with the standard limits and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(IngestLimits::default(), Arc::new(SystemClock))
    }

    /// Creates a pipeline with the standard limits and the supplied clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_limits(IngestLimits::default(), clock)
    }

    /// Creates a pipeline with explicit limits.
    #[must_use]
    pub fn with_limits(limits: IngestLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            limiter: RateLimiter::new(limits.max_requests, limits.window_seconds),
            buffer: EventBuffer::new(limits.buffer_capacity),
            next_event_id: AtomicU64::new(1),
            max_body_bytes: limits.max_body_bytes,
            clock,
        }
    }

    /// Returns the accepted-event buffer.
    #[must_use]
    pub const fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    /// Runs one request through the boundary checks.
    ///
    /// On success returns the number of events stored.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason`] naming the first failed check.
    pub fn submit(
        &self,
        content_type: Option<&str>,
        client_key: &str,
        body: &[u8],
        request_id: &str,
    ) -> Result<usize, RejectReason> {
        if !is_json_content_type(content_type) {
            return Err(RejectReason::UnsupportedMediaType);
        }
        let now = self.clock.now();
        if !self.limiter.register(client_key, now) {
            return Err(RejectReason::RateLimited);
        }
        if body.len() > self.max_body_bytes {
            return Err(RejectReason::PayloadTooLarge);
        }
        let document: Value = serde_json::from_slice(body)
            .map_err(|err| RejectReason::Malformed(format!("body is not valid json: {err}")))?;
        let raw_events = match document {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => {
                return Err(RejectReason::Malformed(
                    "body must be an event object or an array of events".to_string(),
                ));
            }
        };
        let mut validated = Vec::with_capacity(raw_events.len());
        for raw in raw_events {
            validated.push(validate_event(raw, request_id, now)?);
        }
        let stored = validated.len();
        for mut event in validated {
            event.id = self.next_event_id.fetch_add(1, Ordering::Relaxed);
            self.buffer.push(event);
        }
        Ok(stored)
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Returns true when the content type is JSON, ignoring parameters.
fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"))
}

/// Validates one raw event into its stored form.
fn validate_event(
    raw: Value,
    request_id: &str,
    now: Timestamp,
) -> Result<ObservedEvent, RejectReason> {
    let Value::Object(mut fields) = raw else {
        return Err(RejectReason::Malformed("event must be a json object".to_string()));
    };
    let event_type = take_string(&mut fields, "type")
        .ok_or_else(|| RejectReason::Malformed("event missing type".to_string()))?;
    if !ALLOWED_EVENT_TYPES.contains(&event_type.as_str()) {
        return Err(RejectReason::Malformed(format!(
            "unsupported event type: {event_type}; allowed: {}",
            ALLOWED_EVENT_TYPES.join(", ")
        )));
    }
    let level = take_string(&mut fields, "level")
        .ok_or_else(|| RejectReason::Malformed("event missing level".to_string()))?;
    if !ALLOWED_LEVELS.contains(&level.as_str()) {
        return Err(RejectReason::Malformed(format!(
            "unsupported level: {level}; allowed: {}",
            ALLOWED_LEVELS.join(", ")
        )));
    }
    let event_timestamp = take_string(&mut fields, "timestamp")
        .ok_or_else(|| RejectReason::Malformed("event missing timestamp".to_string()))?;
    validate_utc_timestamp(&event_timestamp)?;
    let mut context = match fields.remove("context") {
        Some(Value::Object(context)) => context,
        Some(_) => {
            return Err(RejectReason::Malformed("event context must be an object".to_string()));
        }
        None => return Err(RejectReason::Malformed("event missing context".to_string())),
    };
    truncate_stack_in_context(&mut context);
    Ok(ObservedEvent {
        // Identifier is assigned at acceptance, after the whole batch passes.
        id: 0,
        event_type,
        level,
        event_timestamp,
        context,
        request_id: request_id.to_string(),
        received_at: now,
    })
}

/// Rejects timestamps that are not UTC ISO-8601.
fn validate_utc_timestamp(value: &str) -> Result<(), RejectReason> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339).map_err(|_| {
        RejectReason::Malformed(format!("event timestamp is not iso-8601: {value}"))
    })?;
    if !parsed.offset().is_utc() {
        return Err(RejectReason::Malformed(format!(
            "event timestamp must be utc: {value}"
        )));
    }
    Ok(())
}

/// Truncates an oversized stack trace inside a context document.
fn truncate_stack_in_context(context: &mut Map<String, Value>) {
    if let Some(Value::String(stack)) = context.get_mut("stack")
        && stack.len() > MAX_STACK_BYTES
    {
        *stack = truncate_utf8(stack, MAX_STACK_BYTES);
    }
}

/// Removes a string field from an event object.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(value)) => Some(value),
        Some(other) => {
            // Put non-string values back so error messages can name the field.
            fields.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

/// Truncates a string to at most `max_bytes`, respecting char boundaries.
#[must_use]
pub fn truncate_utf8(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
