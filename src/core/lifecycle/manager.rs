//! Record lifecycle manager
//!
//! Owns every user-initiated status change. The sync engine only moves
//! records out of `pending`; everything else goes through here.

use super::form::RecordForm;
use super::validation::validate_form;
use crate::adapters::store::{MetadataPatch, MetadataUpdate, RecordFilter, RecordStore};
use crate::core::identity::HealthIdGenerator;
use crate::domain::{
    FieldSyncError, Record, RecordId, RecordMetadata, RecordStatus, Result, SubmissionMode,
    Timestamps,
};
use chrono::Utc;
use std::sync::Arc;

/// Creates, validates and transitions records in the local store
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn RecordStore>,
    ids: HealthIdGenerator,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn RecordStore>, ids: HealthIdGenerator) -> Self {
        Self { store, ids }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Saves an incomplete form as a draft
    ///
    /// Drafts skip validation and are invisible to the sync engine.
    pub async fn create_draft(&self, form: &RecordForm, mode: SubmissionMode) -> Result<Record> {
        let record = self.new_record(form, RecordStatus::Draft, mode, None).await?;
        let stored = self.store.put(&record).await?;

        tracing::info!(
            record_id = %stored.meta.id,
            health_id = %stored.meta.health_id,
            "Draft created"
        );
        Ok(stored)
    }

    /// Replaces the content of an existing draft
    pub async fn update_draft(&self, id: &RecordId, form: &RecordForm) -> Result<Record> {
        let mut record = self.load(id).await?;
        if record.meta.status != RecordStatus::Draft {
            return Err(FieldSyncError::InvalidTransition {
                from: record.meta.status.to_string(),
                to: RecordStatus::Draft.to_string(),
            });
        }

        apply_form(&mut record, form);
        record.meta.timestamps.updated_at = Utc::now();
        self.store.put(&record).await
    }

    /// Saves a form as a `pending` record
    ///
    /// A form without `record_id` creates a new record directly in `pending`.
    /// A form naming a draft promotes it; one naming a failed or pending
    /// record is an edit-then-resubmit. Validation runs first in every case
    /// and nothing is written when it fails.
    pub async fn submit(
        &self,
        form: &RecordForm,
        mode: SubmissionMode,
        submitted_by: Option<&str>,
    ) -> Result<Record> {
        validate_form(form)?;

        let Some(id) = form.record_id.as_ref() else {
            let record = self
                .new_record(form, RecordStatus::Pending, mode, submitted_by)
                .await?;
            let stored = self.store.put(&record).await?;
            tracing::info!(
                record_id = %stored.meta.id,
                health_id = %stored.meta.health_id,
                submission_mode = %stored.meta.submission_mode,
                "Record saved as pending"
            );
            return Ok(stored);
        };

        let existing = self.load(id).await?;
        match existing.meta.status {
            RecordStatus::Draft => {
                let mut record = existing;
                apply_form(&mut record, form);
                self.promote_record(record, submitted_by).await
            }
            RecordStatus::Failed | RecordStatus::Pending => {
                self.resubmit_record(existing, form, submitted_by).await
            }
            RecordStatus::Synced => Err(FieldSyncError::InvalidTransition {
                from: RecordStatus::Synced.to_string(),
                to: RecordStatus::Pending.to_string(),
            }),
        }
    }

    /// Promotes a stored draft to `pending` after validating its content
    pub async fn promote(&self, id: &RecordId, submitted_by: Option<&str>) -> Result<Record> {
        let record = self.load(id).await?;
        validate_form(&RecordForm::from_record(&record))?;
        self.promote_record(record, submitted_by).await
    }

    /// Edits a failed or pending record and queues it again
    ///
    /// The retry budget is reset and the previous failure reason cleared.
    pub async fn edit_and_resubmit(
        &self,
        id: &RecordId,
        form: &RecordForm,
        submitted_by: Option<&str>,
    ) -> Result<Record> {
        validate_form(form)?;
        let record = self.load(id).await?;
        match record.meta.status {
            RecordStatus::Failed | RecordStatus::Pending => {
                self.resubmit_record(record, form, submitted_by).await
            }
            other => Err(FieldSyncError::InvalidTransition {
                from: other.to_string(),
                to: RecordStatus::Pending.to_string(),
            }),
        }
    }

    /// Moves a failed record back to `pending` without changing its content
    pub async fn requeue(&self, id: &RecordId) -> Result<RecordMetadata> {
        let patch = MetadataPatch {
            status: Some(RecordStatus::Pending),
            retry_count: Some(0),
            last_error: Some(None),
            ..MetadataPatch::default()
        };

        match self
            .store
            .apply_metadata(id, RecordStatus::Failed, patch)
            .await?
        {
            MetadataUpdate::Applied(meta) => {
                tracing::info!(record_id = %id, "Record requeued for sync");
                Ok(meta)
            }
            MetadataUpdate::StatusMismatch(meta) => Err(FieldSyncError::InvalidTransition {
                from: meta.status.to_string(),
                to: RecordStatus::Pending.to_string(),
            }),
        }
    }

    /// Requeues every failed record; returns how many moved
    pub async fn requeue_all_failed(&self) -> Result<usize> {
        let failed = self
            .store
            .list_metadata(&RecordFilter::status(RecordStatus::Failed))
            .await?;

        let mut requeued = 0;
        for meta in failed {
            match self.requeue(&meta.id).await {
                Ok(_) => requeued += 1,
                // Another context moved it first
                Err(FieldSyncError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        tracing::info!(requeued = requeued, "Failed records requeued");
        Ok(requeued)
    }

    /// Deletes one record regardless of status; returns whether it existed
    pub async fn purge(&self, id: &RecordId) -> Result<bool> {
        let existed = self.store.get_metadata(id).await?.is_some();
        if existed {
            self.store.delete(id).await?;
            tracing::info!(record_id = %id, "Record purged");
        }
        Ok(existed)
    }

    /// Deletes every synced record; returns how many were removed
    pub async fn purge_synced(&self) -> Result<usize> {
        let synced = self
            .store
            .list_metadata(&RecordFilter::status(RecordStatus::Synced))
            .await?;
        for meta in &synced {
            self.store.delete(&meta.id).await?;
        }

        tracing::info!(purged = synced.len(), "Synced records purged");
        Ok(synced.len())
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        self.store.get(id).await
    }

    async fn load(&self, id: &RecordId) -> Result<Record> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| FieldSyncError::NotFound(id.to_string()))
    }

    async fn new_record(
        &self,
        form: &RecordForm,
        status: RecordStatus,
        mode: SubmissionMode,
        submitted_by: Option<&str>,
    ) -> Result<Record> {
        let now = Utc::now();
        let health_id = self
            .ids
            .generate_checked(&form.child_name, &now, self.store.as_ref())
            .await?;
        let (details, sensitive) = form.split();

        Ok(Record {
            meta: RecordMetadata {
                id: RecordId::generate(),
                health_id,
                server_id: None,
                status,
                submission_mode: mode,
                retry_count: 0,
                last_error: None,
                consent: form.consent,
                details,
                submitted_by: submitted_by.map(str::to_string),
                timestamps: Timestamps::created(now),
            },
            sensitive,
        })
    }

    async fn promote_record(&self, mut record: Record, submitted_by: Option<&str>) -> Result<Record> {
        record
            .transition(RecordStatus::Pending, Utc::now())
            .map_err(|_| FieldSyncError::InvalidTransition {
                from: record.meta.status.to_string(),
                to: RecordStatus::Pending.to_string(),
            })?;
        if let Some(user) = submitted_by {
            record.meta.submitted_by = Some(user.to_string());
        }

        let stored = self.store.put(&record).await?;
        tracing::info!(record_id = %stored.meta.id, "Draft promoted to pending");
        Ok(stored)
    }

    async fn resubmit_record(
        &self,
        mut record: Record,
        form: &RecordForm,
        submitted_by: Option<&str>,
    ) -> Result<Record> {
        let now = Utc::now();
        apply_form(&mut record, form);
        if record.meta.status == RecordStatus::Failed {
            record
                .transition(RecordStatus::Pending, now)
                .map_err(FieldSyncError::Other)?;
        }
        record.meta.retry_count = 0;
        record.meta.last_error = None;
        record.meta.timestamps.updated_at = now;
        if let Some(user) = submitted_by {
            record.meta.submitted_by = Some(user.to_string());
        }

        let stored = self.store.put(&record).await?;
        tracing::info!(record_id = %stored.meta.id, "Record edited and resubmitted");
        Ok(stored)
    }
}

/// Overwrites the editable content of `record`; ids and status are untouched
fn apply_form(record: &mut Record, form: &RecordForm) {
    let (details, sensitive) = form.split();
    record.meta.details = details;
    record.meta.consent = form.consent;
    record.sensitive = sensitive;
}
