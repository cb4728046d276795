// crates/ledger-mirror-core/src/core/credential.rs
// ============================================================================
// Module: Ledger Mirror Credential
// Description: OAuth2 bearer credential issued by the remote token endpoint.
// Purpose: Represent the cached token and its expiry decision in one place.
// Dependencies: crate::core::time, serde
// ============================================================================

//! ## Overview
//! A [`Credential`] is replaced wholesale on every refresh and never partially
//! mutated. Freshness uses a small leeway so a credential about to expire is
//! not handed to a request that would outlive it in the common case; callers
//! still detect the remote invalid-token marker and retry once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Leeway subtracted from the expiry when judging freshness, in seconds.
pub const TOKEN_FRESHNESS_LEEWAY_SECONDS: i64 = 10;

// ============================================================================
// SECTION: Credential
// ============================================================================

/// Cached OAuth2 bearer credential.
///
/// # Invariants
/// - Owned exclusively by the token lifecycle manager.
/// - Replaced wholesale on refresh; fields are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token value.
    pub access_token: String,
    /// Token type reported by the endpoint (usually `bearer`).
    pub token_type: Option<String>,
    /// Scope string reported by the endpoint.
    pub scope: Option<String>,
    /// Absolute expiry instant.
    pub expires_at: Timestamp,
}

impl Credential {
    /// Returns true when the credential is still usable at `now`.
    ///
    /// A credential within [`TOKEN_FRESHNESS_LEEWAY_SECONDS`] of expiry is
    /// treated as stale so callers refresh slightly early.
    #[must_use]
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        !self.access_token.is_empty()
            && now.saturating_add_seconds(TOKEN_FRESHNESS_LEEWAY_SECONDS) < self.expires_at
    }

    /// Returns the whole seconds remaining before expiry at `now`, never negative.
    #[must_use]
    pub fn seconds_remaining(&self, now: Timestamp) -> i64 {
        self.expires_at.seconds_since(now).max(0)
    }
}
