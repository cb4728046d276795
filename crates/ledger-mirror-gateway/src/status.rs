// crates/ledger-mirror-gateway/src/status.rs
// ============================================================================
// Module: Gateway Status
// Description: Redacted connection status for diagnostic surfaces.
// Purpose: Expose configuration health without leaking credentials.
// Dependencies: ledger-mirror-core, serde
// ============================================================================

//! ## Overview
//! Diagnostic surfaces report whether the remote is configured and whether a
//! credential is cached, but never the credential itself. Tokens are reduced
//! to a head/tail preview that is useless for replay while remaining enough
//! for an operator to correlate with the remote's own logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use ledger_mirror_core::RuntimeMode;

// ============================================================================
// SECTION: Token Preview
// ============================================================================

/// Characters kept from the start of a previewed token.
const PREVIEW_HEAD: usize = 6;

/// Characters kept from the end of a previewed token.
const PREVIEW_TAIL: usize = 4;

/// Returns a redacted preview of a bearer token.
///
/// Tokens too short to redact meaningfully are masked entirely.
#[must_use]
pub fn token_preview(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= PREVIEW_HEAD + PREVIEW_TAIL {
        return "***".to_string();
    }
    let head: String = chars[..PREVIEW_HEAD].iter().collect();
    let tail: String = chars[chars.len() - PREVIEW_TAIL..].iter().collect();
    format!("{head}…{tail}")
}

// ============================================================================
// SECTION: Gateway Status
// ============================================================================

/// Redacted summary of a cached credential.
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    /// Redacted preview of the cached token.
    pub token_preview: String,
    /// Seconds until the cached token expires.
    pub seconds_remaining: i64,
}

/// Redacted gateway status document.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    /// Whether remote credentials are configured.
    pub configured: bool,
    /// Runtime mode the process resolved at startup.
    pub mode: RuntimeMode,
    /// Cached credential summary, when one exists.
    pub token: Option<TokenStatus>,
    /// Base URL of the remote API.
    pub base_url: String,
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
    fn previews_keep_head_and_tail_only() {
        let preview = token_preview("abcdef0123456789wxyz");
        assert_eq!(preview, "abcdef…wxyz");
        assert!(!preview.contains("0123456789"));
    }

    #[test]
    fn short_tokens_are_fully_masked() {
        assert_eq!(token_preview(""), "***");
        assert_eq!(token_preview("shorttoken"), "***");
    }

    #[test]
    fn multibyte_tokens_do_not_split_characters() {
        let preview = token_preview(&"é".repeat(20));
        assert_eq!(preview, format!("{}…{}", "é".repeat(6), "é".repeat(4)));
    }
}
