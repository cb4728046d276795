// crates/ledger-mirror-core/src/core/record.rs
// ============================================================================
// Module: Ledger Mirror Record Model
// Description: Local mirror records and their sync lifecycle labels.
// Purpose: Provide the record contract shared by stores and the engine.
// Dependencies: crate::core::time, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`MirrorRecord`] is the local copy of one remote entity plus the pending
//! operation against it. Records start `local` when a mutation is queued
//! offline, become `synced` after a successful push or pull upsert, and fall
//! to `error` (retaining `last_error` and the payload) when a push fails so a
//! later run can retry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Remote entity class a record mirrors.
///
/// # Invariants
/// - The label is non-empty and stable; it keys store lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    /// Creates an entity type label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Pending operation recorded against the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    /// Entity must be created remotely.
    Create,
    /// Entity must be updated remotely.
    Update,
    /// Entity must be deleted remotely.
    Delete,
}

impl SyncOperation {
    /// Returns a stable label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parses a stored label back into an operation.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Sync lifecycle status of a mirror record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Mutation queued locally, not yet pushed.
    Local,
    /// Record matches the remote system.
    Synced,
    /// Last push attempt failed; `last_error` holds the reason.
    Error,
}

impl SyncStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }

    /// Parses a stored label back into a status.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "local" => Some(Self::Local),
            "synced" => Some(Self::Synced),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Mirror Record
// ============================================================================

/// One mirrored entity plus its pending operation and sync state.
///
/// # Invariants
/// - `record_id` is the local identity; `external_id` appears only once the
///   remote system has assigned one.
/// - A failed push keeps the payload intact so the record can be retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRecord {
    /// Store-assigned local identity.
    pub record_id: u64,
    /// Entity class this record mirrors.
    pub entity_type: EntityType,
    /// Operation pending (or last replayed) against the remote system.
    pub operation: SyncOperation,
    /// Remote identifier, once assigned.
    pub external_id: Option<String>,
    /// Opaque entity document.
    pub payload: Value,
    /// Sync lifecycle status.
    pub status: SyncStatus,
    /// Failure reason from the last push attempt, when `status` is `error`.
    pub last_error: Option<String>,
    /// Creation instant.
    pub created_at: Timestamp,
    /// Last modification instant.
    pub updated_at: Timestamp,
}
