//! Local store abstraction
//!
//! The store is the only state shared between the foreground context and the
//! background worker. Every write for one record is atomic, and metadata can
//! be read without decrypting anything.

use crate::domain::{HealthId, Record, RecordId, RecordMetadata, RecordStatus, Result, ServerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Selects records by status, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Only records in this status (all statuses when `None`)
    pub status: Option<RecordStatus>,

    /// Maximum number of records returned
    pub limit: Option<usize>,
}

impl RecordFilter {
    /// Matches every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches records in one status
    pub fn status(status: RecordStatus) -> Self {
        Self {
            status: Some(status),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `meta` passes the status part of the filter
    pub fn matches(&self, meta: &RecordMetadata) -> bool {
        self.status.map_or(true, |s| s == meta.status)
    }
}

/// Metadata-only change applied by [`RecordStore::apply_metadata`]
///
/// Sensitive fields are never touched, so no re-encryption happens.
/// `updated_at` is always bumped; `synced_at` is stamped on the first
/// transition into `synced`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub status: Option<RecordStatus>,
    pub server_id: Option<ServerId>,
    pub retry_count: Option<u32>,

    /// `Some(None)` clears the stored reason
    pub last_error: Option<Option<String>>,

    pub submitted_by: Option<String>,
}

impl MetadataPatch {
    /// Marks the record synced with the server-assigned id
    pub fn synced(server_id: Option<ServerId>) -> Self {
        Self {
            status: Some(RecordStatus::Synced),
            server_id,
            last_error: Some(None),
            ..Self::default()
        }
    }

    /// Records a failed attempt, optionally moving the record to `status`
    pub fn failed_attempt(status: RecordStatus, retry_count: u32, reason: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            retry_count: Some(retry_count),
            last_error: Some(Some(reason.into())),
            ..Self::default()
        }
    }
}

/// Outcome of a conditional metadata update
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataUpdate {
    /// The record was in the expected status and the patch was applied
    Applied(RecordMetadata),

    /// The record had moved on; nothing was written
    StatusMismatch(RecordMetadata),
}

impl MetadataUpdate {
    pub fn metadata(&self) -> &RecordMetadata {
        match self {
            MetadataUpdate::Applied(m) | MetadataUpdate::StatusMismatch(m) => m,
        }
    }
}

/// A form parked while the user authenticates
#[derive(Debug, Clone, PartialEq)]
pub struct HeldForm {
    /// Serialized form state
    pub form: serde_json::Value,

    pub held_at: DateTime<Utc>,
}

/// Durable record storage with field encryption
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts or replaces a record
    ///
    /// Sensitive fields are encrypted before they reach disk. Replacing a
    /// record keeps its original `created_at` and refuses a changed
    /// `health_id`. The replacement must follow the state machine from the
    /// status currently stored: a `synced` row is never overwritten, and a
    /// row that changed status under the caller gives
    /// [`FieldSyncError::InvalidTransition`](crate::domain::FieldSyncError::InvalidTransition).
    async fn put(&self, record: &Record) -> Result<Record>;

    /// Loads and decrypts one record
    async fn get(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Loads and decrypts every record matching `filter`, oldest first
    async fn get_all(&self, filter: &RecordFilter) -> Result<Vec<Record>>;

    /// Deletes a record; deleting a missing record is not an error
    async fn delete(&self, id: &RecordId) -> Result<()>;

    /// Counts records without decrypting
    async fn count(&self, filter: &RecordFilter) -> Result<usize>;

    /// Lists clear-text metadata without decrypting
    async fn list_metadata(&self, filter: &RecordFilter) -> Result<Vec<RecordMetadata>>;

    /// Loads the clear-text metadata of one record
    async fn get_metadata(&self, id: &RecordId) -> Result<Option<RecordMetadata>>;

    /// Whether any record already carries this health ID
    async fn health_id_exists(&self, health_id: &HealthId) -> Result<bool>;

    /// Applies `patch` only if the record is currently in `expected` status
    ///
    /// The check and the write happen atomically. Returns
    /// [`FieldSyncError::NotFound`](crate::domain::FieldSyncError::NotFound)
    /// for an unknown id and `InvalidTransition` when the patch would break
    /// the lifecycle state machine.
    async fn apply_metadata(
        &self,
        id: &RecordId,
        expected: RecordStatus,
        patch: MetadataPatch,
    ) -> Result<MetadataUpdate>;

    /// Loads the encrypted settings blob
    async fn load_settings(&self) -> Result<Option<serde_json::Value>>;

    /// Replaces the encrypted settings blob
    async fn save_settings(&self, settings: &serde_json::Value) -> Result<()>;

    /// Parks a form, replacing any previously held one
    async fn hold_form(&self, form: &serde_json::Value) -> Result<DateTime<Utc>>;

    /// Returns the held form without removing it
    async fn peek_held_form(&self) -> Result<Option<HeldForm>>;

    /// Discards the held form
    async fn clear_held_form(&self) -> Result<()>;

    /// Releases connections; further calls fail
    async fn close(&self);
}
