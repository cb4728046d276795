// crates/ledger-mirror-store-sqlite/src/lib.rs
// ============================================================================
// Module: Ledger Mirror SQLite Store Library
// Description: Durable mirror store backed by SQLite.
// Purpose: Expose the SQLite store and its configuration surface.
// Dependencies: ledger-mirror-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Durable [`MirrorStore`] implementation over `SQLite`. Payloads are stored
//! as JSON; rows that no longer decode fail closed as corruption rather than
//! being silently skipped.
//!
//! [`MirrorStore`]: ledger_mirror_core::MirrorStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteJournalMode;
pub use store::SqliteMirrorStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
