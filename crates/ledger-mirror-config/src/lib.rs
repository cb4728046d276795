// crates/ledger-mirror-config/src/lib.rs
// ============================================================================
// Module: Ledger Mirror Config Library
// Description: Configuration loading and validation.
// Purpose: Expose the canonical configuration model for all binaries.
// Dependencies: ledger-mirror-core, ledger-mirror-gateway, serde, toml
// ============================================================================

//! ## Overview
//! One TOML file configures the whole mirror: remote service credentials,
//! cache backend, local store, runtime mode, and the ingest boundary.
//! Configuration is untrusted input; loading fails closed on anything
//! oversized, unparseable, or internally inconsistent.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CacheBackend;
pub use config::CacheConfig;
pub use config::ConfigError;
pub use config::IngestConfig;
pub use config::LedgerMirrorConfig;
pub use config::RuntimeConfig;
pub use config::TtlOverride;
