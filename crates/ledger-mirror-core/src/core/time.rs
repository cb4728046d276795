// crates/ledger-mirror-core/src/core/time.rs
// ============================================================================
// Module: Ledger Mirror Time Model
// Description: Unix-second timestamps and the injectable clock seam.
// Purpose: Keep expiry logic deterministic and testable without sleeping.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Credential expiry, cache TTLs, and rate-limit windows all compare against
//! "now". Components never read wall-clock time directly; they hold a
//! [`Clock`] so tests can drive time explicitly via [`ManualClock`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix-epoch timestamp in whole seconds.
///
/// # Invariants
/// - Values are explicitly provided by a [`Clock`]; core logic never reads
///   wall-clock time directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix seconds.
    #[must_use]
    pub const fn from_unix_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Returns the timestamp as unix seconds.
    #[must_use]
    pub const fn as_unix_seconds(self) -> i64 {
        self.0
    }

    /// Returns this timestamp shifted forward by `seconds`.
    #[must_use]
    pub const fn saturating_add_seconds(self, seconds: i64) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    /// Returns the whole seconds elapsed from `earlier` to `self`.
    #[must_use]
    pub const fn seconds_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of "now" for expiry and windowing decisions.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Wall-clock backed [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Timestamp::from_unix_seconds(seconds)
    }
}

/// Manually advanced [`Clock`] for tests.
///
/// # Invariants
/// - Time only moves when a caller sets or advances it.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current unix-second value.
    now: Mutex<i64>,
}

impl ManualClock {
    /// Creates a manual clock starting at the given unix seconds.
    #[must_use]
    pub fn starting_at(seconds: i64) -> Self {
        Self {
            now: Mutex::new(seconds),
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = guard.saturating_add(seconds);
        }
    }

    /// Sets the clock to an absolute unix-second value.
    pub fn set(&self, seconds: i64) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = seconds;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let seconds = self.now.lock().map(|guard| *guard).unwrap_or(0);
        Timestamp::from_unix_seconds(seconds)
    }
}
