// crates/ledger-mirror-core/src/runtime/mod.rs
// ============================================================================
// Module: Ledger Mirror Runtime
// Description: Runtime mode gates and the reconciliation engine.
// Purpose: Expose the mode policy, the engine, and the in-memory store.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime layer holds the process-wide mode policy, the reconciliation
//! engine that moves state between the remote system and the local mirror,
//! and an in-memory mirror store for tests and local runs.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod mode;
pub mod reconcile;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use mode::PolicyError;
pub use mode::RuntimeMode;
pub use mode::ensure_debug_allowed;
pub use mode::ensure_write_allowed;
pub use reconcile::PUSH_BATCH_LIMIT;
pub use reconcile::ReconcileEngine;
pub use reconcile::ReconcileOutcome;
pub use reconcile::ReconcileReport;
pub use store::InMemoryMirrorStore;
pub use store::SharedMirrorStore;
