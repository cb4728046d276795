// crates/ledger-mirror-core/src/runtime/mode.rs
// ============================================================================
// Module: Ledger Mirror Runtime Mode
// Description: Process-wide restricted/unrestricted mode policy.
// Purpose: Gate mutating and diagnostic operations by runtime mode.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The runtime mode is resolved once from configuration and then consulted by
//! pure gate functions. Restricted mode disables writes reachable from the
//! external boundary; unrestricted (production) mode hides diagnostic
//! surfaces. The gates have no side effects beyond returning an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Runtime Mode
// ============================================================================

/// Process-wide runtime mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    /// Development / read-only mode: mutations are refused, diagnostics open.
    #[default]
    Restricted,
    /// Production mode: mutations allowed, diagnostics hidden.
    Unrestricted,
}

impl RuntimeMode {
    /// Returns true when the process runs in restricted mode.
    #[must_use]
    pub const fn is_restricted(self) -> bool {
        matches!(self, Self::Restricted)
    }

    /// Returns a stable label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Restricted => "restricted",
            Self::Unrestricted => "unrestricted",
        }
    }
}

// ============================================================================
// SECTION: Policy Gates
// ============================================================================

/// Runtime policy violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// Mutation attempted while the process runs read-only.
    #[error("read-only mode: mutating operations are disabled")]
    Forbidden,
    /// Diagnostic surface requested in production; reported as absent.
    #[error("not found")]
    NotFound,
}

/// Fails when mutating operations are disabled by the runtime mode.
///
/// # Errors
///
/// Returns [`PolicyError::Forbidden`] in restricted mode.
pub const fn ensure_write_allowed(mode: RuntimeMode) -> Result<(), PolicyError> {
    match mode {
        RuntimeMode::Restricted => Err(PolicyError::Forbidden),
        RuntimeMode::Unrestricted => Ok(()),
    }
}

/// Fails when diagnostic surfaces must stay hidden.
///
/// Diagnostics are visible only in restricted (development) mode; production
/// reports them as absent rather than forbidden so the surface is not
/// discoverable.
///
/// # Errors
///
/// Returns [`PolicyError::NotFound`] in unrestricted mode.
pub const fn ensure_debug_allowed(mode: RuntimeMode) -> Result<(), PolicyError> {
    match mode {
        RuntimeMode::Restricted => Ok(()),
        RuntimeMode::Unrestricted => Err(PolicyError::NotFound),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_mode_blocks_writes_and_allows_debug() {
        assert_eq!(ensure_write_allowed(RuntimeMode::Restricted), Err(PolicyError::Forbidden));
        assert_eq!(ensure_debug_allowed(RuntimeMode::Restricted), Ok(()));
    }

    #[test]
    fn unrestricted_mode_allows_writes_and_hides_debug() {
        assert_eq!(ensure_write_allowed(RuntimeMode::Unrestricted), Ok(()));
        assert_eq!(ensure_debug_allowed(RuntimeMode::Unrestricted), Err(PolicyError::NotFound));
    }
}
