// crates/ledger-mirror-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Mirror Store
// Description: Durable MirrorStore backed by SQLite WAL.
// Purpose: Persist mirror records across process restarts.
// Dependencies: ledger-mirror-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`MirrorStore`] using `SQLite`. The
//! connection is serialized through a mutex; WAL mode keeps readers from
//! blocking the writer in multi-handle deployments. Loads fail closed: a row
//! whose payload or labels no longer decode is reported as corruption, never
//! silently dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

use ledger_mirror_core::Clock;
use ledger_mirror_core::EntityType;
use ledger_mirror_core::MirrorRecord;
use ledger_mirror_core::MirrorStore;
use ledger_mirror_core::NewMirrorRecord;
use ledger_mirror_core::RecordFilter;
use ledger_mirror_core::StoreError;
use ledger_mirror_core::SyncOperation;
use ledger_mirror_core::SyncStatus;
use ledger_mirror_core::SystemClock;
use ledger_mirror_core::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` mirror store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw record payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Db(message)
            | SqliteStoreError::VersionMismatch(message)
            | SqliteStoreError::Invalid(message) => Self::Backend(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed mirror store with WAL support.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Record decodes fail closed on corruption.
#[derive(Clone)]
pub struct SqliteMirrorStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Clock used to stamp created/updated instants.
    clock: Arc<dyn Clock>,
}

impl SqliteMirrorStore {
    /// Opens (or creates) the store at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened, the
    /// pragmas fail, or the schema version is unsupported.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Opens the store stamped by the supplied clock.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened, the
    /// pragmas fail, or the schema version is unsupported.
    pub fn open_with_clock(
        config: &SqliteStoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SqliteStoreError> {
        if config.path.exists() && config.path.is_dir() {
            return Err(SqliteStoreError::Invalid(
                "store path must be a file, not a directory".to_string(),
            ));
        }
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            clock,
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection mutex poisoned".to_string()))
    }
}

impl MirrorStore for SqliteMirrorStore {
    fn create(&self, draft: NewMirrorRecord) -> Result<MirrorRecord, StoreError> {
        let now = self.clock.now();
        let payload = serde_json::to_string(&draft.payload)
            .map_err(|err| StoreError::Backend(format!("payload serialization failed: {err}")))?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO mirror_records
                    (entity_type, operation, external_id, payload_json, status, last_error,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)",
                params![
                    draft.entity_type.as_str(),
                    draft.operation.as_str(),
                    draft.external_id,
                    payload,
                    draft.status.as_str(),
                    now.as_unix_seconds(),
                ],
            )
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let record_id = u64::try_from(guard.last_insert_rowid())
            .map_err(|_| StoreError::Backend("negative rowid".to_string()))?;
        Ok(MirrorRecord {
            record_id,
            entity_type: draft.entity_type,
            operation: draft.operation,
            external_id: draft.external_id,
            payload: draft.payload,
            status: draft.status,
            last_error: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn update(&self, record: &MirrorRecord) -> Result<MirrorRecord, StoreError> {
        let now = self.clock.now();
        let payload = serde_json::to_string(&record.payload)
            .map_err(|err| StoreError::Backend(format!("payload serialization failed: {err}")))?;
        let record_id = i64::try_from(record.record_id)
            .map_err(|_| StoreError::Backend("record id exceeds sqlite range".to_string()))?;
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE mirror_records
                 SET entity_type = ?2, operation = ?3, external_id = ?4, payload_json = ?5,
                     status = ?6, last_error = ?7, updated_at = ?8
                 WHERE record_id = ?1",
                params![
                    record_id,
                    record.entity_type.as_str(),
                    record.operation.as_str(),
                    record.external_id,
                    payload,
                    record.status.as_str(),
                    record.last_error,
                    now.as_unix_seconds(),
                ],
            )
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(record.record_id));
        }
        let mut updated = record.clone();
        updated.updated_at = now;
        Ok(updated)
    }

    fn get_by_external_id(
        &self,
        entity_type: &EntityType,
        external_id: &str,
    ) -> Result<Option<MirrorRecord>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT record_id, entity_type, operation, external_id, payload_json, status,
                        last_error, created_at, updated_at
                 FROM mirror_records
                 WHERE entity_type = ?1 AND external_id = ?2
                 ORDER BY record_id
                 LIMIT 1",
                params![entity_type.as_str(), external_id],
                decode_row,
            )
            .optional()
            .map_err(|err| StoreError::Backend(err.to_string()))?
            .transpose()
    }

    fn delete(&self, record_id: u64) -> Result<(), StoreError> {
        let bound_id = i64::try_from(record_id)
            .map_err(|_| StoreError::Backend("record id exceeds sqlite range".to_string()))?;
        let guard = self.lock()?;
        let changed = guard
            .execute("DELETE FROM mirror_records WHERE record_id = ?1", params![bound_id])
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(record_id));
        }
        Ok(())
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<MirrorRecord>, StoreError> {
        let guard = self.lock()?;
        let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(filter.offset).unwrap_or(i64::MAX);
        let status_label = filter.status.map(SyncStatus::as_str);
        let mut statement = guard
            .prepare(
                "SELECT record_id, entity_type, operation, external_id, payload_json, status,
                        last_error, created_at, updated_at
                 FROM mirror_records
                 WHERE entity_type = ?1 AND (?2 IS NULL OR status = ?2)
                 ORDER BY record_id
                 LIMIT ?3 OFFSET ?4",
            )
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let rows = statement
            .query_map(
                params![filter.entity_type.as_str(), status_label, limit, offset],
                decode_row,
            )
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let mut records = Vec::new();
        for row in rows {
            let record = row.map_err(|err| StoreError::Backend(err.to_string()))??;
            records.push(record);
        }
        Ok(records)
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Decodes one row into a record, failing closed on corruption.
fn decode_row(row: &Row<'_>) -> rusqlite::Result<Result<MirrorRecord, StoreError>> {
    let record_id: i64 = row.get(0)?;
    let entity_type: String = row.get(1)?;
    let operation: String = row.get(2)?;
    let external_id: Option<String> = row.get(3)?;
    let payload_json: String = row.get(4)?;
    let status: String = row.get(5)?;
    let last_error: Option<String> = row.get(6)?;
    let created_at: i64 = row.get(7)?;
    let updated_at: i64 = row.get(8)?;
    Ok(decode_record(RawRecord {
        record_id,
        entity_type,
        operation,
        external_id,
        payload_json,
        status,
        last_error,
        created_at,
        updated_at,
    }))
}

/// Raw row fields before label and payload validation.
struct RawRecord {
    /// Store-assigned local identity as read from the database.
    record_id: i64,
    /// Entity type label.
    entity_type: String,
    /// Operation label.
    operation: String,
    /// Remote identifier, when assigned.
    external_id: Option<String>,
    /// Payload JSON text.
    payload_json: String,
    /// Status label.
    status: String,
    /// Failure reason from the last push attempt.
    last_error: Option<String>,
    /// Creation instant in unix seconds.
    created_at: i64,
    /// Last modification instant in unix seconds.
    updated_at: i64,
}

/// Validates labels and payload of one raw row.
fn decode_record(raw: RawRecord) -> Result<MirrorRecord, StoreError> {
    let record_id = u64::try_from(raw.record_id).map_err(|_| {
        StoreError::Corrupt(format!("record {} has a negative record id", raw.record_id))
    })?;
    let operation = SyncOperation::from_label(&raw.operation).ok_or_else(|| {
        StoreError::Corrupt(format!("record {} has unknown operation label", raw.record_id))
    })?;
    let status = SyncStatus::from_label(&raw.status).ok_or_else(|| {
        StoreError::Corrupt(format!("record {} has unknown status label", raw.record_id))
    })?;
    let payload = serde_json::from_str(&raw.payload_json).map_err(|_| {
        StoreError::Corrupt(format!("record {} payload is not valid json", raw.record_id))
    })?;
    Ok(MirrorRecord {
        record_id,
        entity_type: EntityType::new(raw.entity_type),
        operation,
        external_id: raw.external_id,
        payload,
        status,
        last_error: raw.last_error,
        created_at: Timestamp::from_unix_seconds(raw.created_at),
        updated_at: Timestamp::from_unix_seconds(raw.updated_at),
    })
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS mirror_records (
                    record_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    entity_type TEXT NOT NULL,
                    operation TEXT NOT NULL,
                    external_id TEXT,
                    payload_json BLOB NOT NULL,
                    status TEXT NOT NULL,
                    last_error TEXT,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_mirror_records_entity_status
                    ON mirror_records (entity_type, status);
                CREATE INDEX IF NOT EXISTS idx_mirror_records_external
                    ON mirror_records (entity_type, external_id);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
