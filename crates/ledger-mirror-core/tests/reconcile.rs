// crates/ledger-mirror-core/tests/reconcile.rs
// ============================================================================
// Module: Reconciliation Engine Tests
// Description: Tests for pull upsert semantics and push partial failure.
// ============================================================================
//! ## Overview
//! Validates pull idempotence, upsert-by-external-id, and the per-record
//! failure isolation of push runs.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;

use ledger_mirror_core::EntityType;
use ledger_mirror_core::InMemoryMirrorStore;
use ledger_mirror_core::MirrorStore;
use ledger_mirror_core::NewMirrorRecord;
use ledger_mirror_core::NoopAuditSink;
use ledger_mirror_core::ReconcileEngine;
use ledger_mirror_core::ReconcileOutcome;
use ledger_mirror_core::RecordFilter;
use ledger_mirror_core::RemoteServiceError;
use ledger_mirror_core::ResourceGateway;
use ledger_mirror_core::RuntimeMode;
use ledger_mirror_core::SyncOperation;
use ledger_mirror_core::SyncStatus;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Scripted gateway over an in-memory item list.
struct ScriptedGateway {
    /// Items returned by `list`.
    items: Mutex<Vec<Value>>,
    /// Names whose create call fails with a remote 500.
    failing_names: Vec<String>,
    /// Next id assigned by `create`.
    next_id: Mutex<i64>,
    /// When set, `list` fails with a transport error.
    list_fails: bool,
    /// Calls observed, by operation label.
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    fn new(items: Vec<Value>) -> Self {
        Self {
            items: Mutex::new(items),
            failing_names: Vec::new(),
            next_id: Mutex::new(1000),
            list_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, name: &str) -> Self {
        self.failing_names.push(name.to_string());
        self
    }

    fn with_broken_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ResourceGateway for ScriptedGateway {
    fn resource_label(&self) -> &str {
        "product"
    }

    fn external_id_of(&self, item: &Value) -> Option<String> {
        item.get("id").map(std::string::ToString::to_string)
    }

    fn list(&self) -> Result<Vec<Value>, RemoteServiceError> {
        self.calls.lock().unwrap().push("list".to_string());
        if self.list_fails {
            return Err(RemoteServiceError::Transport("connection reset".to_string()));
        }
        Ok(self.items.lock().unwrap().clone())
    }

    fn get(&self, id: i64) -> Result<Option<Value>, RemoteServiceError> {
        let items = self.items.lock().unwrap();
        Ok(items.iter().find(|item| item.get("id") == Some(&json!(id))).cloned())
    }

    fn create(&self, data: &Value) -> Result<Value, RemoteServiceError> {
        self.calls.lock().unwrap().push("create".to_string());
        let name = data.get("name").and_then(Value::as_str).unwrap_or_default();
        if self.failing_names.iter().any(|failing| failing == name) {
            return Err(RemoteServiceError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        let mut created = data.clone();
        created["id"] = json!(*id);
        self.items.lock().unwrap().push(created.clone());
        Ok(created)
    }

    fn update(&self, id: i64, data: &Value) -> Result<Option<Value>, RemoteServiceError> {
        self.calls.lock().unwrap().push("update".to_string());
        let mut items = self.items.lock().unwrap();
        let Some(item) = items.iter_mut().find(|item| item.get("id") == Some(&json!(id))) else {
            return Ok(None);
        };
        *item = data.clone();
        (*item)["id"] = json!(id);
        Ok(Some(item.clone()))
    }

    fn patch(&self, id: i64, data: &Value) -> Result<Option<Value>, RemoteServiceError> {
        self.update(id, data)
    }

    fn delete(&self, id: i64) -> Result<bool, RemoteServiceError> {
        self.calls.lock().unwrap().push("delete".to_string());
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|item| item.get("id") != Some(&json!(id)));
        Ok(items.len() < before)
    }
}

fn products() -> EntityType {
    EntityType::new("product")
}

fn all_records(store: &InMemoryMirrorStore) -> Vec<ledger_mirror_core::MirrorRecord> {
    store
        .list(&RecordFilter {
            entity_type: products(),
            status: None,
            limit: 1000,
            offset: 0,
        })
        .unwrap()
}

fn queue_local(store: &InMemoryMirrorStore, name: &str) -> u64 {
    store
        .create(NewMirrorRecord {
            entity_type: products(),
            operation: SyncOperation::Create,
            external_id: None,
            payload: json!({ "name": name }),
            status: SyncStatus::Local,
        })
        .unwrap()
        .record_id
}

// ============================================================================
// SECTION: Pull Tests
// ============================================================================

#[test]
fn restricted_pull_seeds_placeholder_exactly_once() {
    let gateway = ScriptedGateway::new(vec![]);
    let store = InMemoryMirrorStore::new();
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Restricted,
        Arc::new(NoopAuditSink),
    );

    let first = engine.pull();
    let second = engine.pull();

    assert_eq!(first.outcome, ReconcileOutcome::Ok);
    assert_eq!(first.processed, 1);
    assert_eq!(second.processed, 0);
    assert_eq!(gateway.call_count(), 0, "restricted pull must stay offline");

    let records = all_records(&store);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].external_id.as_deref(), Some("demo-1"));
    assert_eq!(records[0].status, SyncStatus::Synced);
}

#[test]
fn unrestricted_pull_upserts_by_external_id() {
    let gateway = ScriptedGateway::new(vec![
        json!({ "id": 7, "name": "Widget" }),
        json!({ "id": 8, "name": "Gadget" }),
    ]);
    let store = InMemoryMirrorStore::new();
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Unrestricted,
        Arc::new(NoopAuditSink),
    );

    assert_eq!(engine.pull().processed, 2);
    assert_eq!(all_records(&store).len(), 2);

    // The remote changed one item; a second pull updates in place.
    gateway.items.lock().unwrap()[0] = json!({ "id": 7, "name": "Widget v2" });
    assert_eq!(engine.pull().processed, 2);

    let records = all_records(&store);
    assert_eq!(records.len(), 2, "second pull must not duplicate records");
    let updated = records
        .iter()
        .find(|record| record.external_id.as_deref() == Some("7"))
        .unwrap();
    assert_eq!(updated.payload["name"], json!("Widget v2"));
    assert_eq!(updated.status, SyncStatus::Synced);
}

#[test]
fn pull_merges_remote_fields_over_local_extras() {
    let gateway = ScriptedGateway::new(vec![json!({ "id": 7, "name": "Widget v2" })]);
    let store = InMemoryMirrorStore::new();
    store
        .create(NewMirrorRecord {
            entity_type: products(),
            operation: SyncOperation::Create,
            external_id: Some("7".to_string()),
            payload: json!({ "id": 7, "name": "Widget", "local_note": "keep me" }),
            status: SyncStatus::Synced,
        })
        .unwrap();
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Unrestricted,
        Arc::new(NoopAuditSink),
    );

    assert_eq!(engine.pull().processed, 1);

    let records = all_records(&store);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payload["name"], json!("Widget v2"));
    assert_eq!(records[0].payload["local_note"], json!("keep me"));
}

#[test]
fn unrestricted_pull_skips_items_without_identifier() {
    let gateway = ScriptedGateway::new(vec![
        json!({ "name": "orphan" }),
        json!({ "id": 3, "name": "kept" }),
    ]);
    let store = InMemoryMirrorStore::new();
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Unrestricted,
        Arc::new(NoopAuditSink),
    );

    let report = engine.pull();
    assert_eq!(report.outcome, ReconcileOutcome::Ok);
    assert_eq!(report.processed, 1);
    assert_eq!(all_records(&store).len(), 1);
}

#[test]
fn pull_failure_is_reported_not_propagated() {
    let gateway = ScriptedGateway::new(vec![]).with_broken_list();
    let store = InMemoryMirrorStore::new();
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Unrestricted,
        Arc::new(NoopAuditSink),
    );

    let report = engine.pull();
    assert_eq!(report.outcome, ReconcileOutcome::Error);
    assert!(report.detail.unwrap().contains("connection reset"));
    assert!(all_records(&store).is_empty());
}

// ============================================================================
// SECTION: Push Tests
// ============================================================================

#[test]
fn push_isolates_per_record_failures() {
    let gateway = ScriptedGateway::new(vec![]).failing_on("second");
    let store = InMemoryMirrorStore::new();
    let first = queue_local(&store, "first");
    let second = queue_local(&store, "second");
    let third = queue_local(&store, "third");
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Unrestricted,
        Arc::new(NoopAuditSink),
    );

    let report = engine.push();
    assert_eq!(report.outcome, ReconcileOutcome::Ok);
    assert_eq!(report.processed, 3);
    assert_eq!(report.failed, 1);

    let records = all_records(&store);
    let by_id = |id: u64| records.iter().find(|record| record.record_id == id).unwrap();
    assert_eq!(by_id(first).status, SyncStatus::Synced);
    assert_eq!(by_id(third).status, SyncStatus::Synced);
    assert_eq!(by_id(second).status, SyncStatus::Error);
    assert!(by_id(second).last_error.as_deref().unwrap().contains("500"));
}

#[test]
fn push_adopts_remote_identity_for_created_records() {
    let gateway = ScriptedGateway::new(vec![]);
    let store = InMemoryMirrorStore::new();
    queue_local(&store, "fresh");
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Unrestricted,
        Arc::new(NoopAuditSink),
    );

    assert_eq!(engine.push().failed, 0);

    let records = all_records(&store);
    assert_eq!(records.len(), 1);
    assert!(records[0].external_id.is_some());
    assert_eq!(records[0].status, SyncStatus::Synced);
    assert!(records[0].payload.get("id").is_some());
}

#[test]
fn push_skips_records_missing_mandatory_field() {
    let gateway = ScriptedGateway::new(vec![]);
    let store = InMemoryMirrorStore::new();
    store
        .create(NewMirrorRecord {
            entity_type: products(),
            operation: SyncOperation::Create,
            external_id: None,
            payload: json!({ "description": "no name here" }),
            status: SyncStatus::Local,
        })
        .unwrap();
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Unrestricted,
        Arc::new(NoopAuditSink),
    );

    let report = engine.push();
    assert_eq!(report.processed, 0);
    assert_eq!(gateway.call_count(), 0);

    // The record stays queued rather than erroring.
    let records = all_records(&store);
    assert_eq!(records[0].status, SyncStatus::Local);
}

#[test]
fn restricted_push_marks_synced_without_remote_calls() {
    let gateway = ScriptedGateway::new(vec![]);
    let store = InMemoryMirrorStore::new();
    queue_local(&store, "offline");
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Restricted,
        Arc::new(NoopAuditSink),
    );

    let report = engine.push();
    assert_eq!(report.processed, 1);
    assert_eq!(gateway.call_count(), 0);
    assert_eq!(all_records(&store)[0].status, SyncStatus::Synced);
}

#[test]
fn push_replays_updates_and_deletes_by_numeric_id() {
    let gateway = ScriptedGateway::new(vec![
        json!({ "id": 21, "name": "tracked" }),
        json!({ "id": 22, "name": "doomed" }),
    ]);
    let store = InMemoryMirrorStore::new();
    store
        .create(NewMirrorRecord {
            entity_type: products(),
            operation: SyncOperation::Update,
            external_id: Some("21".to_string()),
            payload: json!({ "name": "tracked v2" }),
            status: SyncStatus::Local,
        })
        .unwrap();
    store
        .create(NewMirrorRecord {
            entity_type: products(),
            operation: SyncOperation::Delete,
            external_id: Some("22".to_string()),
            payload: json!({}),
            status: SyncStatus::Local,
        })
        .unwrap();
    let engine = ReconcileEngine::new(
        &gateway,
        &store,
        products(),
        RuntimeMode::Unrestricted,
        Arc::new(NoopAuditSink),
    );

    let report = engine.push();
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 0);

    let items = gateway.items.lock().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], json!("tracked v2"));
}
