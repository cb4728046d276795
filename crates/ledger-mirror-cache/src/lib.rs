// crates/ledger-mirror-cache/src/lib.rs
// ============================================================================
// Module: Ledger Mirror Cache Library
// Description: Cache provider implementations for the Ledger Mirror.
// Purpose: Expose the in-memory and Redis-backed cache providers.
// Dependencies: ledger-mirror-core, redis, serde_json
// ============================================================================

//! ## Overview
//! This crate implements the core [`CacheProvider`] contract twice: an
//! in-process provider for single-node and test use, and a Redis-backed
//! provider for shared deployments. Both honor per-call TTL semantics where
//! a TTL of zero disables caching entirely.
//!
//! [`CacheProvider`]: ledger_mirror_core::CacheProvider

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod memory;
pub mod redis_backend;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use memory::InMemoryCacheProvider;
pub use redis_backend::RedisCacheProvider;
