// crates/ledger-mirror-ingest/src/lib.rs
// ============================================================================
// Module: Ledger Mirror Ingest Library
// Description: Observability event ingestion boundary.
// Purpose: Expose the validation pipeline and the HTTP server surface.
// Dependencies: ledger-mirror-core, axum, rand, serde_json, time, tokio
// ============================================================================

//! ## Overview
//! Browser-facing telemetry ingestion: events arrive over HTTP, pass a strict
//! validation pipeline (media type, rate limit, size, shape), and land in a
//! bounded in-memory ring buffer. Inputs are untrusted; the pipeline fails
//! closed and the buffer evicts oldest-first under pressure.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod pipeline;
pub mod request_id;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use pipeline::EventBuffer;
pub use pipeline::IngestLimits;
pub use pipeline::IngestPipeline;
pub use pipeline::ObservedEvent;
pub use pipeline::RateLimiter;
pub use pipeline::RejectReason;
pub use request_id::RequestIdGenerator;
pub use server::IngestServerConfig;
pub use server::IngestServerError;
pub use server::IngestState;
pub use server::ingest_router;
pub use server::serve;
