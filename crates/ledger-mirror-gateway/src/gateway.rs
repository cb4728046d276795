// crates/ledger-mirror-gateway/src/gateway.rs
// ============================================================================
// Module: Resource Client
// Description: Cache-aware gateway over one remote resource type.
// Purpose: Implement the core gateway contract with read-through caching.
// Dependencies: ledger-mirror-core, serde_json, crate::{http, resource}
// ============================================================================

//! ## Overview
//! One [`ResourceClient`] serves one entry of the resource registry. Reads
//! go through the cache; a cache backend failure is audited and treated as a
//! miss so the remote remains reachable when the cache is down. Successful
//! mutations invalidate the resource's list entry and the item entry they
//! touched. A delete the remote reports as already-absent invalidates
//! nothing, since the cached state may be all that is left to serve.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;

use ledger_mirror_core::AuditEvent;
use ledger_mirror_core::AuditSink;
use ledger_mirror_core::CacheProvider;
use ledger_mirror_core::RemoteServiceError;
use ledger_mirror_core::ResourceGateway;

use crate::http::RemoteHttpClient;
use crate::http::extract_list;
use crate::resource::DetailStrategy;
use crate::resource::ResourceSpec;

// ============================================================================
// SECTION: Cache TTLs
// ============================================================================

/// Cache lifetimes for one resource client, in seconds.
///
/// A value of zero disables caching for the corresponding read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Lifetime of cached list responses.
    pub list_seconds: u64,
    /// Lifetime of cached single items.
    pub item_seconds: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            list_seconds: 300,
            item_seconds: 300,
        }
    }
}

// ============================================================================
// SECTION: Resource Client
// ============================================================================

/// Cache-aware client over one remote resource type.
pub struct ResourceClient {
    /// Static description of the resource.
    spec: &'static ResourceSpec,
    /// Authenticated HTTP client.
    http: Arc<RemoteHttpClient>,
    /// Read-through cache.
    cache: Arc<dyn CacheProvider>,
    /// Cache lifetimes.
    ttls: CacheTtls,
    /// Audit sink for cache and fallback events.
    audit: Arc<dyn AuditSink>,
}

impl ResourceClient {
    /// Creates a client for one registry entry.
    pub fn new(
        spec: &'static ResourceSpec,
        http: Arc<RemoteHttpClient>,
        cache: Arc<dyn CacheProvider>,
        ttls: CacheTtls,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            spec,
            http,
            cache,
            ttls,
            audit,
        }
    }

    /// Cache key for the resource's list response.
    fn list_key(&self) -> String {
        format!("{}:list", self.spec.label)
    }

    /// Cache key for one item.
    fn item_key(&self, id: i64) -> String {
        format!("{}:item:{id}", self.spec.label)
    }

    /// Reads a cached value, demoting backend failures to misses.
    fn cache_get(&self, key: &str, ttl: u64) -> Option<Value> {
        match self.cache.get(key, ttl) {
            Ok(hit) => hit,
            Err(err) => {
                self.audit_cache_failure("get", key, &err.to_string());
                None
            }
        }
    }

    /// Writes a cached value, demoting backend failures to no-ops.
    fn cache_set(&self, key: &str, value: &Value, ttl: u64) {
        if let Err(err) = self.cache.set(key, value, ttl) {
            self.audit_cache_failure("set", key, &err.to_string());
        }
    }

    /// Drops a cached value, demoting backend failures to no-ops.
    fn cache_delete(&self, key: &str) {
        if let Err(err) = self.cache.delete(key) {
            self.audit_cache_failure("delete", key, &err.to_string());
        }
    }

    /// Audits one cache backend failure.
    fn audit_cache_failure(&self, operation: &str, key: &str, detail: &str) {
        self.audit.record(&AuditEvent::now(
            "cache_backend_failed",
            None,
            json!({
                "resource": self.spec.label,
                "operation": operation,
                "key": key,
                "detail": detail,
            }),
        ));
    }

    /// Invalidates cache entries after a successful mutation.
    fn invalidate_after_mutation(&self, id: Option<i64>) {
        self.cache_delete(&self.list_key());
        if let Some(id) = id {
            self.cache_delete(&self.item_key(id));
        }
    }

    /// Fetches the remote list, bypassing the cache.
    ///
    /// A 404 from the list endpoint means no items exist, not an error.
    fn list_remote(&self) -> Result<Vec<Value>, RemoteServiceError> {
        let Some(document) = self.http.get_json(self.spec.path)? else {
            return Ok(Vec::new());
        };
        extract_list(document, self.spec.label)
    }

    /// Scans the list for one item by identifier.
    fn find_in_list(&self, id: i64) -> Result<Option<Value>, RemoteServiceError> {
        let wanted = id.to_string();
        let items = self.list()?;
        Ok(items.into_iter().find(|item| self.spec.id_of(item).as_deref() == Some(&wanted)))
    }

    /// Fetches one item from the detail endpoint, caching hits.
    fn get_detail(&self, id: i64) -> Result<Option<Value>, RemoteServiceError> {
        let key = self.item_key(id);
        if let Some(hit) = self.cache_get(&key, self.ttls.item_seconds) {
            return Ok(Some(hit));
        }
        let Some(item) = self.http.get_json(&self.spec.item_path(id))? else {
            return Ok(None);
        };
        self.cache_set(&key, &item, self.ttls.item_seconds);
        Ok(Some(item))
    }

    /// Primes per-item entries from a fresh list so follow-up reads skip
    /// the network.
    fn prime_item_entries(&self, items: &[Value]) {
        if self.ttls.item_seconds == 0 {
            return;
        }
        for item in items {
            if let Some(id) = self.spec.id_of(item).and_then(|id| id.parse::<i64>().ok()) {
                self.cache_set(&self.item_key(id), item, self.ttls.item_seconds);
            }
        }
    }

    /// Fails unsupported mutations on immutable resources.
    fn ensure_mutable(&self) -> Result<(), RemoteServiceError> {
        if self.spec.mutable {
            return Ok(());
        }
        Err(RemoteServiceError::Unsupported {
            resource: self.spec.label.to_string(),
        })
    }
}

impl ResourceGateway for ResourceClient {
    fn resource_label(&self) -> &str {
        self.spec.label
    }

    fn external_id_of(&self, item: &Value) -> Option<String> {
        self.spec.id_of(item)
    }

    fn list(&self) -> Result<Vec<Value>, RemoteServiceError> {
        let key = self.list_key();
        if let Some(Value::Array(items)) = self.cache_get(&key, self.ttls.list_seconds) {
            return Ok(items);
        }
        let items = self.list_remote()?;
        self.cache_set(&key, &Value::Array(items.clone()), self.ttls.list_seconds);
        self.prime_item_entries(&items);
        Ok(items)
    }

    fn get(&self, id: i64) -> Result<Option<Value>, RemoteServiceError> {
        match self.spec.detail {
            DetailStrategy::ListOnly => self.find_in_list(id),
            DetailStrategy::GetWithServerErrorFallback => match self.get_detail(id) {
                Err(RemoteServiceError::Status { status, .. }) if status >= 500 => {
                    self.audit_fallback(id, "server_error");
                    self.find_in_list(id)
                }
                other => other,
            },
            DetailStrategy::GetWithListFallback => match self.get_detail(id) {
                Ok(Some(item)) => Ok(Some(item)),
                Ok(None) => {
                    self.audit_fallback(id, "absent");
                    self.find_in_list(id)
                }
                Err(RemoteServiceError::Status { status, .. }) if status >= 500 => {
                    self.audit_fallback(id, "server_error");
                    self.find_in_list(id)
                }
                Err(err) => Err(err),
            },
            DetailStrategy::ListLookup => match self.find_in_list(id)? {
                Some(item) => Ok(Some(item)),
                None => self.get_detail(id),
            },
        }
    }

    fn create(&self, data: &Value) -> Result<Value, RemoteServiceError> {
        self.ensure_mutable()?;
        let created = self.http.post_json(self.spec.path, data)?;
        self.invalidate_after_mutation(None);
        Ok(created)
    }

    fn update(&self, id: i64, data: &Value) -> Result<Option<Value>, RemoteServiceError> {
        self.ensure_mutable()?;
        let Some(updated) = self.http.put_json(&self.spec.item_path(id), data)? else {
            return Ok(None);
        };
        self.invalidate_after_mutation(Some(id));
        Ok(Some(updated))
    }

    fn patch(&self, id: i64, data: &Value) -> Result<Option<Value>, RemoteServiceError> {
        self.ensure_mutable()?;
        let Some(patched) = self.http.patch_json(&self.spec.item_path(id), data)? else {
            return Ok(None);
        };
        self.invalidate_after_mutation(Some(id));
        Ok(Some(patched))
    }

    fn delete(&self, id: i64) -> Result<bool, RemoteServiceError> {
        self.ensure_mutable()?;
        if !self.http.delete(&self.spec.item_path(id))? {
            return Ok(false);
        }
        self.invalidate_after_mutation(Some(id));
        Ok(true)
    }
}

impl ResourceClient {
    /// Audits one detail-endpoint fallback to a list scan.
    fn audit_fallback(&self, id: i64, reason: &str) {
        self.audit.record(&AuditEvent::now(
            "detail_fallback_to_list",
            None,
            json!({
                "resource": self.spec.label,
                "id": id,
                "reason": reason,
            }),
        ));
    }
}
