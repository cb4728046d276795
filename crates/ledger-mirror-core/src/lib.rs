// crates/ledger-mirror-core/src/lib.rs
// ============================================================================
// Module: Ledger Mirror Core Library
// Description: Public API surface for the Ledger Mirror core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Ledger Mirror core provides the shared data model, contract surfaces, and
//! reconciliation runtime for mirroring business entities against a remote
//! accounting service. It is backend-agnostic: HTTP gateways, cache backends,
//! and mirror stores plug in through explicit interfaces rather than being
//! embedded here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditEvent;
pub use interfaces::AuditSink;
pub use interfaces::CacheError;
pub use interfaces::CacheProvider;
pub use interfaces::MirrorStore;
pub use interfaces::NewMirrorRecord;
pub use interfaces::NoopAuditSink;
pub use interfaces::RecordFilter;
pub use interfaces::RemoteServiceError;
pub use interfaces::ResourceGateway;
pub use interfaces::StderrAuditSink;
pub use interfaces::StoreError;
pub use interfaces::TokenError;
pub use runtime::InMemoryMirrorStore;
pub use runtime::PUSH_BATCH_LIMIT;
pub use runtime::PolicyError;
pub use runtime::ReconcileEngine;
pub use runtime::ReconcileOutcome;
pub use runtime::ReconcileReport;
pub use runtime::RuntimeMode;
pub use runtime::SharedMirrorStore;
pub use runtime::ensure_debug_allowed;
pub use runtime::ensure_write_allowed;
