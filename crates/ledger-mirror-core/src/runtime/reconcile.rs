// crates/ledger-mirror-core/src/runtime/reconcile.rs
// ============================================================================
// Module: Ledger Mirror Reconciliation Engine
// Description: Pull/push reconciliation between the remote system and mirror.
// Purpose: Upsert remote state locally and replay queued local mutations.
// Dependencies: crate::{core, interfaces, runtime::mode}, serde_json
// ============================================================================

//! ## Overview
//! The engine runs two directions over one entity type. `pull` fetches the
//! remote list and upserts each item into the mirror keyed by its remote
//! identifier; in restricted mode it never touches the network and only seeds
//! a placeholder record once. `push` replays queued local mutations through
//! the gateway with partial-failure semantics: one bad record is marked
//! `error` and the batch continues.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;

use crate::core::EntityType;
use crate::core::MirrorRecord;
use crate::core::SyncOperation;
use crate::core::SyncStatus;
use crate::interfaces::AuditEvent;
use crate::interfaces::AuditSink;
use crate::interfaces::MirrorStore;
use crate::interfaces::NewMirrorRecord;
use crate::interfaces::RecordFilter;
use crate::interfaces::RemoteServiceError;
use crate::interfaces::ResourceGateway;
use crate::interfaces::StoreError;
use crate::runtime::mode::RuntimeMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum pending records replayed per push run.
pub const PUSH_BATCH_LIMIT: usize = 100;

/// External identifier of the restricted-mode placeholder record.
const PLACEHOLDER_EXTERNAL_ID: &str = "demo-1";

/// Payload field every pushed entity must carry.
const REQUIRED_PAYLOAD_FIELD: &str = "name";

// ============================================================================
// SECTION: Report
// ============================================================================

/// Overall outcome of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Run completed; individual records may still have failed.
    Ok,
    /// Run aborted before completing.
    Error,
}

impl ReconcileOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Structured result of a pull or push run.
///
/// # Invariants
/// - `detail` is populated exactly when `outcome` is [`ReconcileOutcome::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Overall outcome.
    pub outcome: ReconcileOutcome,
    /// Failure description when the run aborted.
    pub detail: Option<String>,
    /// Records upserted (pull) or replayed (push).
    pub processed: usize,
    /// Records that ended in `error` status during a push.
    pub failed: usize,
}

impl ReconcileReport {
    /// Builds a success report.
    #[must_use]
    pub const fn ok(processed: usize, failed: usize) -> Self {
        Self {
            outcome: ReconcileOutcome::Ok,
            detail: None,
            processed,
            failed,
        }
    }

    /// Builds an aborted-run report.
    #[must_use]
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            outcome: ReconcileOutcome::Error,
            detail: Some(detail.into()),
            processed: 0,
            failed: 0,
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Reconciliation engine for one entity type.
pub struct ReconcileEngine<'a> {
    /// Gateway over the matching remote resource.
    gateway: &'a dyn ResourceGateway,
    /// Local mirror store.
    store: &'a dyn MirrorStore,
    /// Entity type reconciled by this engine.
    entity_type: EntityType,
    /// Runtime mode resolved from configuration.
    mode: RuntimeMode,
    /// Audit sink for run and per-record events.
    audit: Arc<dyn AuditSink>,
}

impl<'a> ReconcileEngine<'a> {
    /// Creates an engine over one gateway/store pair.
    pub fn new(
        gateway: &'a dyn ResourceGateway,
        store: &'a dyn MirrorStore,
        entity_type: EntityType,
        mode: RuntimeMode,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            gateway,
            store,
            entity_type,
            mode,
            audit,
        }
    }

    /// Pulls remote state into the mirror.
    ///
    /// Failures are reported in the returned [`ReconcileReport`], never
    /// propagated; records upserted before a failure remain in place.
    #[must_use]
    pub fn pull(&self) -> ReconcileReport {
        let result = if self.mode.is_restricted() {
            self.seed_placeholder()
        } else {
            self.pull_remote()
        };
        match result {
            Ok(report) => report,
            Err(detail) => {
                self.audit.record(&AuditEvent::now(
                    "reconcile_pull_failed",
                    None,
                    json!({ "entity_type": self.entity_type.as_str(), "detail": detail }),
                ));
                ReconcileReport::error(detail)
            }
        }
    }

    /// Pushes queued local mutations to the remote system.
    ///
    /// Each record's outcome is independent; a failed record is set to
    /// `error` with `last_error` populated and the batch continues.
    #[must_use]
    pub fn push(&self) -> ReconcileReport {
        let result = if self.mode.is_restricted() {
            self.push_local_only()
        } else {
            self.push_remote()
        };
        match result {
            Ok(report) => report,
            Err(detail) => {
                self.audit.record(&AuditEvent::now(
                    "reconcile_push_failed",
                    None,
                    json!({ "entity_type": self.entity_type.as_str(), "detail": detail }),
                ));
                ReconcileReport::error(detail)
            }
        }
    }

    // ------------------------------------------------------------------
    // Pull paths
    // ------------------------------------------------------------------

    /// Seeds one placeholder record when the mirror is empty.
    ///
    /// Idempotent: a second run finds the mirror non-empty and does nothing.
    fn seed_placeholder(&self) -> Result<ReconcileReport, String> {
        let probe = RecordFilter {
            entity_type: self.entity_type.clone(),
            status: None,
            limit: 1,
            offset: 0,
        };
        let existing = self.store.list(&probe).map_err(|err| err.to_string())?;
        if !existing.is_empty() {
            return Ok(ReconcileReport::ok(0, 0));
        }
        self.store
            .create(NewMirrorRecord {
                entity_type: self.entity_type.clone(),
                operation: SyncOperation::Create,
                external_id: Some(PLACEHOLDER_EXTERNAL_ID.to_string()),
                payload: json!({
                    "external_id": PLACEHOLDER_EXTERNAL_ID,
                    "name": "Demo product",
                }),
                status: SyncStatus::Synced,
            })
            .map_err(|err| err.to_string())?;
        Ok(ReconcileReport::ok(1, 0))
    }

    /// Fetches the remote list and upserts every item into the mirror.
    fn pull_remote(&self) -> Result<ReconcileReport, String> {
        let items = self.gateway.list().map_err(|err| err.to_string())?;
        let mut processed = 0usize;
        for item in items {
            let Some(external_id) = self.gateway.external_id_of(&item) else {
                self.audit.record(&AuditEvent::now(
                    "reconcile_item_skipped",
                    None,
                    json!({
                        "entity_type": self.entity_type.as_str(),
                        "reason": "missing_external_id",
                    }),
                ));
                continue;
            };
            self.upsert(&external_id, item).map_err(|err| err.to_string())?;
            processed += 1;
        }
        Ok(ReconcileReport::ok(processed, 0))
    }

    /// Creates or updates the mirror record for one remote item.
    fn upsert(&self, external_id: &str, item: Value) -> Result<(), StoreError> {
        match self.store.get_by_external_id(&self.entity_type, external_id)? {
            Some(mut existing) => {
                existing.operation = SyncOperation::Update;
                existing.payload = merge_payload(existing.payload, item);
                existing.status = SyncStatus::Synced;
                existing.last_error = None;
                self.store.update(&existing)?;
            }
            None => {
                self.store.create(NewMirrorRecord {
                    entity_type: self.entity_type.clone(),
                    operation: SyncOperation::Create,
                    external_id: Some(external_id.to_string()),
                    payload: item,
                    status: SyncStatus::Synced,
                })?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Push paths
    // ------------------------------------------------------------------

    /// Returns the pending batch of `local` records.
    fn pending_batch(&self) -> Result<Vec<MirrorRecord>, StoreError> {
        self.store.list(&RecordFilter {
            entity_type: self.entity_type.clone(),
            status: Some(SyncStatus::Local),
            limit: PUSH_BATCH_LIMIT,
            offset: 0,
        })
    }

    /// Marks all pending records synced without contacting the remote.
    fn push_local_only(&self) -> Result<ReconcileReport, String> {
        let records = self.pending_batch().map_err(|err| err.to_string())?;
        let mut processed = 0usize;
        for mut record in records {
            record.status = SyncStatus::Synced;
            record.last_error = None;
            self.store.update(&record).map_err(|err| err.to_string())?;
            processed += 1;
        }
        Ok(ReconcileReport::ok(processed, 0))
    }

    /// Replays pending records against the gateway, one outcome per record.
    fn push_remote(&self) -> Result<ReconcileReport, String> {
        let records = self.pending_batch().map_err(|err| err.to_string())?;
        let mut processed = 0usize;
        let mut failed = 0usize;
        for record in records {
            if self.skip_invalid(&record) {
                continue;
            }
            match self.replay(&record) {
                Ok(replayed) => {
                    self.store.update(&replayed).map_err(|err| err.to_string())?;
                    processed += 1;
                }
                Err(err) => {
                    let mut errored = record;
                    errored.status = SyncStatus::Error;
                    errored.last_error = Some(err.to_string());
                    self.store.update(&errored).map_err(|store_err| store_err.to_string())?;
                    self.audit.record(&AuditEvent::now(
                        "reconcile_record_failed",
                        None,
                        json!({
                            "entity_type": self.entity_type.as_str(),
                            "record_id": errored.record_id,
                            "operation": errored.operation.as_str(),
                            "detail": err.to_string(),
                        }),
                    ));
                    processed += 1;
                    failed += 1;
                }
            }
        }
        Ok(ReconcileReport::ok(processed, failed))
    }

    /// Skips records that cannot be replayed, logging a warning.
    ///
    /// Missing mandatory payload fields and missing external ids for
    /// update/delete are data-entry problems, not push failures.
    fn skip_invalid(&self, record: &MirrorRecord) -> bool {
        let reason = if !matches!(record.operation, SyncOperation::Delete)
            && !has_required_field(&record.payload)
        {
            Some("missing_required_field")
        } else if !matches!(record.operation, SyncOperation::Create)
            && record.external_id.is_none()
        {
            Some("missing_external_id")
        } else {
            None
        };
        let Some(reason) = reason else {
            return false;
        };
        self.audit.record(&AuditEvent::now(
            "reconcile_record_skipped",
            None,
            json!({
                "entity_type": self.entity_type.as_str(),
                "record_id": record.record_id,
                "operation": record.operation.as_str(),
                "reason": reason,
            }),
        ));
        true
    }

    /// Replays one record and returns the synced form to persist.
    fn replay(&self, record: &MirrorRecord) -> Result<MirrorRecord, RemoteServiceError> {
        let mut synced = record.clone();
        match record.operation {
            SyncOperation::Create => {
                let created = self.gateway.create(&record.payload)?;
                if let Some(assigned) = self.gateway.external_id_of(&created) {
                    synced.external_id = Some(assigned);
                }
                synced.payload = created;
            }
            SyncOperation::Update => {
                let id = self.numeric_external_id(record)?;
                let Some(updated) = self.gateway.update(id, &record.payload)? else {
                    return Err(RemoteServiceError::Status {
                        status: 404,
                        body: "resource vanished remotely".to_string(),
                    });
                };
                synced.payload = updated;
            }
            SyncOperation::Delete => {
                let id = self.numeric_external_id(record)?;
                self.gateway.delete(id)?;
            }
        }
        synced.status = SyncStatus::Synced;
        synced.last_error = None;
        Ok(synced)
    }

    /// Parses the record's external id into the gateway's numeric form.
    fn numeric_external_id(&self, record: &MirrorRecord) -> Result<i64, RemoteServiceError> {
        let raw = record.external_id.as_deref().unwrap_or_default();
        raw.parse::<i64>().map_err(|_| RemoteServiceError::Unsupported {
            resource: format!("{}: non-numeric external id {raw:?}", self.entity_type.as_str()),
        })
    }
}

/// Shallow-merges fresh remote fields over an existing payload.
///
/// Fields only the mirror knows about survive; anything both sides carry
/// takes the remote value. Non-object payloads are replaced wholesale.
fn merge_payload(existing: Value, fresh: Value) -> Value {
    match (existing, fresh) {
        (Value::Object(mut base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, fresh) => fresh,
    }
}

/// Returns true when the payload carries a non-empty mandatory field.
fn has_required_field(payload: &Value) -> bool {
    payload
        .get(REQUIRED_PAYLOAD_FIELD)
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty())
}
