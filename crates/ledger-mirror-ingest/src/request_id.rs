// crates/ledger-mirror-ingest/src/request_id.rs
// ============================================================================
// Module: Request Identifier Policy
// Description: Boot-scoped request identifier generation for ingestion.
// Purpose: Stamp every ingest request with a unique, auditable identifier.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Every ingest request is stamped with a server-issued identifier that is
//! unique within the process lifetime: a boot-scoped random seed plus a
//! monotonic counter. Clients never supply identifiers; telemetry input is
//! untrusted and gets no say in audit correlation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Boot-scoped request identifier generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct RequestIdGenerator {
    /// Prefix included in every generated identifier.
    prefix: &'static str,
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for identifiers issued in this process.
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a new generator with the given prefix.
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            prefix,
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new request identifier.
    #[must_use]
    pub fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:016x}-{:016x}", self.prefix, self.boot_id, seq)
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

    use super::*;

    #[test]
    fn issued_identifiers_are_unique_and_prefixed() {
        let generator = RequestIdGenerator::new("evt");
        let first = generator.issue();
        let second = generator.issue();
        assert!(first.starts_with("evt-"));
        assert_ne!(first, second);
    }
}
