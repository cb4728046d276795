// crates/ledger-mirror-core/src/runtime/store.rs
// ============================================================================
// Module: Ledger Mirror In-Memory Store
// Description: Simple in-memory mirror store for tests and local runs.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of [`MirrorStore`]
//! for tests and restricted-mode local runs. It is not intended for
//! production use; the sqlite store crate provides the durable variant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::core::Clock;
use crate::core::EntityType;
use crate::core::MirrorRecord;
use crate::core::SystemClock;
use crate::interfaces::MirrorStore;
use crate::interfaces::NewMirrorRecord;
use crate::interfaces::RecordFilter;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory mirror store for tests and local runs.
pub struct InMemoryMirrorStore {
    /// Record map keyed by local identity, protected by a mutex.
    records: Arc<Mutex<BTreeMap<u64, MirrorRecord>>>,
    /// Next local identity to assign.
    next_id: AtomicU64,
    /// Clock used to stamp created/updated instants.
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryMirrorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMirrorStore {
    /// Creates a new store stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a new store stamped by the supplied clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
            clock,
        }
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// Returns true when the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Locks the record map.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<u64, MirrorRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Backend("mirror store mutex poisoned".to_string()))
    }
}

impl MirrorStore for InMemoryMirrorStore {
    fn create(&self, draft: NewMirrorRecord) -> Result<MirrorRecord, StoreError> {
        let now = self.clock.now();
        let record_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = MirrorRecord {
            record_id,
            entity_type: draft.entity_type,
            operation: draft.operation,
            external_id: draft.external_id,
            payload: draft.payload,
            status: draft.status,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.insert(record_id, record.clone());
        Ok(record)
    }

    fn update(&self, record: &MirrorRecord) -> Result<MirrorRecord, StoreError> {
        let mut guard = self.lock()?;
        let Some(stored) = guard.get_mut(&record.record_id) else {
            return Err(StoreError::RecordNotFound(record.record_id));
        };
        let mut updated = record.clone();
        updated.created_at = stored.created_at;
        updated.updated_at = self.clock.now();
        *stored = updated.clone();
        Ok(updated)
    }

    fn get_by_external_id(
        &self,
        entity_type: &EntityType,
        external_id: &str,
    ) -> Result<Option<MirrorRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .find(|record| {
                record.entity_type == *entity_type
                    && record.external_id.as_deref() == Some(external_id)
            })
            .cloned())
    }

    fn delete(&self, record_id: u64) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.remove(&record_id).is_none() {
            return Err(StoreError::RecordNotFound(record_id));
        }
        Ok(())
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<MirrorRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .filter(|record| record.entity_type == filter.entity_type)
            .filter(|record| filter.status.is_none_or(|status| record.status == status))
            .skip(filter.offset)
            .take(filter.limit)
            .cloned()
            .collect())
    }
}

// ============================================================================
// SECTION: Shared Store Handle
// ============================================================================

/// Cloneable handle over a dynamic mirror store.
#[derive(Clone)]
pub struct SharedMirrorStore {
    /// Underlying store implementation.
    inner: Arc<dyn MirrorStore>,
}

impl SharedMirrorStore {
    /// Wraps a concrete store in a shared handle.
    pub fn from_store(store: impl MirrorStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn as_store(&self) -> &dyn MirrorStore {
        self.inner.as_ref()
    }
}

impl MirrorStore for SharedMirrorStore {
    fn create(&self, draft: NewMirrorRecord) -> Result<MirrorRecord, StoreError> {
        self.inner.create(draft)
    }

    fn update(&self, record: &MirrorRecord) -> Result<MirrorRecord, StoreError> {
        self.inner.update(record)
    }

    fn get_by_external_id(
        &self,
        entity_type: &EntityType,
        external_id: &str,
    ) -> Result<Option<MirrorRecord>, StoreError> {
        self.inner.get_by_external_id(entity_type, external_id)
    }

    fn delete(&self, record_id: u64) -> Result<(), StoreError> {
        self.inner.delete(record_id)
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<MirrorRecord>, StoreError> {
        self.inner.list(filter)
    }
}
