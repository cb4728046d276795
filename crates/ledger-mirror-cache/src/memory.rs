// crates/ledger-mirror-cache/src/memory.rs
// ============================================================================
// Module: In-Memory Cache Provider
// Description: Process-local cache with read-time TTL enforcement.
// Purpose: Provide the default cache backend for single-node deployments.
// Dependencies: ledger-mirror-core, serde_json
// ============================================================================

//! ## Overview
//! Entries carry their insertion instant; freshness is decided at read time
//! against the TTL supplied by the caller, so the same entry can be fresh for
//! one caller and stale for another. Stale entries are purged by the read
//! that discovers them. Values cross the boundary as owned clones in both
//! directions, so callers can never mutate a cached document in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;

use ledger_mirror_core::CacheError;
use ledger_mirror_core::CacheProvider;
use ledger_mirror_core::Clock;
use ledger_mirror_core::SystemClock;
use ledger_mirror_core::Timestamp;

// ============================================================================
// SECTION: Cache Entry
// ============================================================================

/// One cached value with its insertion instant.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Cached document.
    value: Value,
    /// Instant the entry was stored.
    stored_at: Timestamp,
}

// ============================================================================
// SECTION: In-Memory Provider
// ============================================================================

/// Process-local cache provider.
pub struct InMemoryCacheProvider {
    /// Entry map protected by a mutex.
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Clock used to stamp and age entries.
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheProvider {
    /// Creates a provider aged by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a provider aged by the supplied clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Locks the entry map.
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CacheEntry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Backend("cache mutex poisoned".to_string()))
    }
}

impl CacheProvider for InMemoryCacheProvider {
    fn get(&self, key: &str, ttl_seconds: u64) -> Result<Option<Value>, CacheError> {
        if ttl_seconds == 0 {
            return Ok(None);
        }
        let now = self.clock.now();
        let mut guard = self.lock()?;
        let Some(entry) = guard.get(key) else {
            return Ok(None);
        };
        let age = now.seconds_since(entry.stored_at);
        if age >= i64::try_from(ttl_seconds).unwrap_or(i64::MAX) {
            guard.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), CacheError> {
        if ttl_seconds == 0 {
            return Ok(());
        }
        let entry = CacheEntry {
            value: value.clone(),
            stored_at: self.clock.now(),
        };
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.lock()?.clear();
        Ok(())
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

    use ledger_mirror_core::ManualClock;
    use serde_json::json;

    use super::*;

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = InMemoryCacheProvider::new();
        cache.set("k", &json!({ "a": 1 }), 0).unwrap();
        assert_eq!(cache.get("k", 0).unwrap(), None);
        // Even a fresh write under a real TTL stays invisible to zero-TTL reads.
        cache.set("k", &json!({ "a": 1 }), 60).unwrap();
        assert_eq!(cache.get("k", 0).unwrap(), None);
    }

    #[test]
    fn entries_expire_at_read_time() {
        let clock = Arc::new(ManualClock::starting_at(1_000));
        let cache = InMemoryCacheProvider::with_clock(clock.clone());
        cache.set("k", &json!("v"), 30).unwrap();

        clock.advance(29);
        assert_eq!(cache.get("k", 30).unwrap(), Some(json!("v")));

        clock.advance(1);
        assert_eq!(cache.get("k", 30).unwrap(), None);
        // The stale entry was purged, so a longer TTL cannot resurrect it.
        assert_eq!(cache.get("k", 300).unwrap(), None);
    }

    #[test]
    fn shorter_read_ttl_beats_write_ttl() {
        let clock = Arc::new(ManualClock::starting_at(0));
        let cache = InMemoryCacheProvider::with_clock(clock.clone());
        cache.set("k", &json!("v"), 300).unwrap();
        clock.advance(10);
        assert_eq!(cache.get("k", 5).unwrap(), None);
    }

    #[test]
    fn returned_values_are_independent_copies() {
        let cache = InMemoryCacheProvider::new();
        let mut original = json!({ "items": [1, 2] });
        cache.set("k", &original, 60).unwrap();

        original["items"] = json!([]);
        let mut fetched = cache.get("k", 60).unwrap().unwrap();
        assert_eq!(fetched["items"], json!([1, 2]));

        fetched["items"] = json!("mutated");
        assert_eq!(cache.get("k", 60).unwrap().unwrap()["items"], json!([1, 2]));
    }

    #[test]
    fn delete_and_clear_remove_entries() {
        let cache = InMemoryCacheProvider::new();
        cache.set("a", &json!(1), 60).unwrap();
        cache.set("b", &json!(2), 60).unwrap();

        cache.delete("a").unwrap();
        assert_eq!(cache.get("a", 60).unwrap(), None);
        assert_eq!(cache.get("b", 60).unwrap(), Some(json!(2)));

        cache.clear().unwrap();
        assert_eq!(cache.get("b", 60).unwrap(), None);
    }
}
