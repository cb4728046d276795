// crates/ledger-mirror-core/src/core/mod.rs
// ============================================================================
// Module: Ledger Mirror Core Types
// Description: Canonical data model for credentials and mirror records.
// Purpose: Provide stable, serializable types shared across all crates.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types cover the remote credential, the local mirror record, and the
//! timestamp/clock seam. These types are the canonical source of truth for
//! any derived surfaces (HTTP boundaries, stores, gateways).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod credential;
pub mod record;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credential::Credential;
pub use credential::TOKEN_FRESHNESS_LEEWAY_SECONDS;
pub use record::EntityType;
pub use record::MirrorRecord;
pub use record::SyncOperation;
pub use record::SyncStatus;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;
pub use time::Timestamp;
