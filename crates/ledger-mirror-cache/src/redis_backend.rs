// crates/ledger-mirror-cache/src/redis_backend.rs
// ============================================================================
// Module: Redis Cache Provider
// Description: Redis-backed cache provider for shared deployments.
// Purpose: Let multiple mirror processes share one read-through cache.
// Dependencies: ledger-mirror-core, redis, serde_json
// ============================================================================

//! ## Overview
//! Values are stored as JSON strings under prefix-scoped keys, with expiry
//! delegated to the server via `SETEX`. A TTL of zero disables the call
//! entirely, matching the in-memory provider. A stored value that no longer
//! parses as JSON is dropped and reported as a miss rather than an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use redis::Client;
use redis::Commands;
use redis::Connection;

use serde_json::Value;

use ledger_mirror_core::CacheError;
use ledger_mirror_core::CacheProvider;

// ============================================================================
// SECTION: Redis Provider
// ============================================================================

/// Redis-backed cache provider.
///
/// # Invariants
/// - Every key is scoped under the configured prefix; `clear` only removes
///   keys within that prefix.
pub struct RedisCacheProvider {
    /// Redis client; connections are established per call.
    client: Client,
    /// Key prefix isolating this provider's entries.
    prefix: String,
}

impl RedisCacheProvider {
    /// Creates a provider for the given connection URL and key prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the URL cannot be parsed.
    pub fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|err| CacheError::Backend(err.to_string()))?;
        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    /// Returns the prefix-scoped form of `key`.
    fn scoped(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    /// Opens a connection to the backend.
    fn connection(&self) -> Result<Connection, CacheError> {
        self.client
            .get_connection()
            .map_err(|err| CacheError::Backend(err.to_string()))
    }
}

impl CacheProvider for RedisCacheProvider {
    fn get(&self, key: &str, ttl_seconds: u64) -> Result<Option<Value>, CacheError> {
        if ttl_seconds == 0 {
            return Ok(None);
        }
        let scoped = self.scoped(key);
        let mut conn = self.connection()?;
        let raw: Option<String> = conn
            .get(&scoped)
            .map_err(|err| CacheError::Backend(err.to_string()))?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                // Corrupt entry: drop it and report a miss.
                let _: () = conn
                    .del(&scoped)
                    .map_err(|err| CacheError::Backend(err.to_string()))?;
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), CacheError> {
        if ttl_seconds == 0 {
            return Ok(());
        }
        let payload =
            serde_json::to_string(value).map_err(|err| CacheError::Backend(err.to_string()))?;
        let mut conn = self.connection()?;
        let _: () = conn
            .set_ex(self.scoped(key), payload, ttl_seconds)
            .map_err(|err| CacheError::Backend(err.to_string()))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection()?;
        let _: () = conn
            .del(self.scoped(key))
            .map_err(|err| CacheError::Backend(err.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.connection()?;
        let keys: Vec<String> = conn
            .keys(format!("{}:*", self.prefix))
            .map_err(|err| CacheError::Backend(err.to_string()))?;
        if keys.is_empty() {
            return Ok(());
        }
        let _: () = conn
            .del(keys)
            .map_err(|err| CacheError::Backend(err.to_string()))?;
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

    use super::*;

    #[test]
    fn keys_are_prefix_scoped() {
        let provider = RedisCacheProvider::connect("redis://127.0.0.1:6379", "mirror").unwrap();
        assert_eq!(provider.scoped("product:list"), "mirror:product:list");
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(RedisCacheProvider::connect("not a url", "mirror").is_err());
    }
}
