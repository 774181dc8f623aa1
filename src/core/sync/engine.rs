//! Sync engine
//!
//! Drains `pending` records to the remote collaborator. One pass at a time
//! per engine: a second call while a pass is running returns
//! [`SyncOutcome::AlreadyRunning`] immediately.
//!
//! A pass first tries one batch request. When the batch fails below the
//! application layer, every record is uploaded on its own, in order, with a
//! short pause between requests, so one bad record cannot block the rest.
//! The fallback loop stops early if connectivity drops or shutdown is
//! requested; records it did not reach stay `pending`.

use super::batch::{match_batch_response, UploadOutcome};
use super::progress::{ProgressReporter, SyncPhase, SyncProgress};
use super::summary::{RecordFailure, SyncOutcome, SyncPath, SyncSummary};
use crate::adapters::remote::{RemoteCollaborator, RemoteRecord, RemoteResult};
use crate::adapters::store::{MetadataPatch, MetadataUpdate, RecordFilter, RecordStore};
use crate::config::{RetryConfig, SecretString, SyncConfig};
use crate::core::auth::SessionStore;
use crate::core::network::Connectivity;
use crate::domain::{FieldSyncError, Record, RecordStatus, RemoteError, Result};
use crate::{log_record_failure, log_retry_attempt, log_sync_complete, log_sync_start};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Resets the in-flight flag when a pass ends, including on error
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Uploads pending records with batch-then-fallback semantics
pub struct SyncEngine {
    store: Arc<dyn RecordStore>,
    remote: Arc<dyn RemoteCollaborator>,
    sessions: SessionStore,
    config: SyncConfig,
    connectivity: Option<watch::Receiver<Connectivity>>,
    shutdown: Option<watch::Receiver<bool>>,
    in_flight: AtomicBool,
    progress: watch::Sender<SyncProgress>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteCollaborator>,
        config: SyncConfig,
    ) -> Self {
        let (progress, _) = watch::channel(SyncProgress::idle());
        Self {
            sessions: SessionStore::new(store.clone()),
            store,
            remote,
            config,
            connectivity: None,
            shutdown: None,
            in_flight: AtomicBool::new(false),
            progress,
        }
    }

    /// Aborts fallback iterations when this receiver reports offline
    pub fn with_connectivity(mut self, connectivity: watch::Receiver<Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Aborts fallback iterations when this receiver flips to true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    /// Runs one sync pass
    pub async fn run_pass(&self) -> Result<SyncOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Sync pass already in flight, skipping");
            return Ok(SyncOutcome::AlreadyRunning);
        }
        let _guard = InFlightGuard(&self.in_flight);

        if self.is_offline() {
            tracing::debug!("No verified connectivity, sync pass skipped");
            return Ok(SyncOutcome::Offline);
        }

        let started = Instant::now();
        let pending = self
            .store
            .list_metadata(&RecordFilter::status(RecordStatus::Pending))
            .await?;
        let mut summary = SyncSummary::new(pending.len());

        if pending.is_empty() {
            tracing::debug!("No pending records");
            return Ok(SyncOutcome::Completed(
                summary.with_duration(started.elapsed()),
            ));
        }

        let records = self.load_pending(pending, &mut summary).await?;
        if records.is_empty() {
            summary.log_summary();
            return Ok(SyncOutcome::Completed(
                summary.with_duration(started.elapsed()),
            ));
        }

        let session = self.sessions.current().await?;
        let token = session.as_ref().map(|s| &s.token);
        let submitter = session.as_ref().map(|s| s.user_id.as_str());
        if session.is_none() {
            tracing::warn!("No active session; uploads will carry no bearer token");
        }

        let payload: Vec<RemoteRecord> = records
            .iter()
            .map(|r| RemoteRecord::from_record(r, submitter))
            .collect();

        log_sync_start!(records.len(), SyncPath::Batch);
        let reporter = ProgressReporter::start(&self.progress, records.len(), SyncPhase::Batch);

        match self.remote.upload_batch(&payload, token).await {
            Ok(response) => {
                summary.path = SyncPath::Batch;
                let outcomes = match_batch_response(&records, response);
                for (record, outcome) in records.iter().zip(outcomes) {
                    self.apply_outcome(record, outcome, submitter, &mut summary)
                        .await?;
                    reporter.advance();
                }
            }
            Err(RemoteError::Unauthorized(reason)) => {
                // Individual uploads would be rejected the same way
                summary.path = SyncPath::Batch;
                tracing::warn!(reason = %reason, "Batch upload unauthorized");
                let err = RemoteError::Unauthorized(reason);
                for record in &records {
                    self.apply_outcome(record, UploadOutcome::from_error(&err), submitter, &mut summary)
                        .await?;
                    reporter.advance();
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    records = records.len(),
                    "Batch upload failed, falling back to individual uploads"
                );
                summary.path = SyncPath::Individual;
                reporter.phase(SyncPhase::Individual);
                self.upload_individually(&records, &payload, token, submitter, &reporter, &mut summary)
                    .await?;
            }
        }

        reporter.finish();
        let summary = summary.with_duration(started.elapsed());
        log_sync_complete!(
            summary.synced + summary.already_synced,
            summary.failed,
            summary.duration
        );
        summary.log_summary();
        Ok(SyncOutcome::Completed(summary))
    }

    /// Decrypts the pending set; records that cannot be decrypted are parked
    /// as failed with the reason, never uploaded
    async fn load_pending(
        &self,
        pending: Vec<crate::domain::RecordMetadata>,
        summary: &mut SyncSummary,
    ) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(pending.len());
        for meta in pending {
            match self.store.get(&meta.id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {
                    tracing::debug!(record_id = %meta.id, "Record removed before upload");
                }
                Err(FieldSyncError::Decryption(e)) => {
                    tracing::error!(
                        record_id = %meta.id,
                        health_id = %meta.health_id,
                        error = %e,
                        "Pending record cannot be decrypted"
                    );
                    let reason = e.to_string();
                    let patch =
                        MetadataPatch::failed_attempt(RecordStatus::Failed, meta.retry_count, reason.clone());
                    if let MetadataUpdate::Applied(_) = self
                        .store
                        .apply_metadata(&meta.id, RecordStatus::Pending, patch)
                        .await?
                    {
                        summary.add_failure(RecordFailure {
                            record_id: meta.id,
                            health_id: meta.health_id,
                            reason,
                            retry_count: meta.retry_count,
                            parked: true,
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    async fn upload_individually(
        &self,
        records: &[Record],
        payload: &[RemoteRecord],
        token: Option<&SecretString>,
        submitter: Option<&str>,
        reporter: &ProgressReporter<'_>,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let delay = Duration::from_millis(self.config.inter_request_delay_ms);

        for (i, (record, remote_record)) in records.iter().zip(payload).enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.should_abort() {
                summary.aborted = true;
                tracing::warn!(
                    remaining = records.len() - i,
                    "Connectivity lost or shutdown requested, stopping fallback uploads"
                );
                break;
            }

            let outcome = match self.upload_with_retry(remote_record, token).await {
                Ok(created) => UploadOutcome::Synced(created.assigned_server_id()),
                Err(e) => UploadOutcome::from_error(&e),
            };
            self.apply_outcome(record, outcome, submitter, summary).await?;
            reporter.advance();
        }
        Ok(())
    }

    /// Uploads one record, retrying transport-level failures with
    /// exponential backoff
    async fn upload_with_retry(
        &self,
        record: &RemoteRecord,
        token: Option<&SecretString>,
    ) -> RemoteResult<RemoteRecord> {
        let max_attempts = self.config.retry.max_attempts;
        let mut attempt = 0;

        loop {
            match self.remote.upload_record(record, token).await {
                Ok(created) => return Ok(created),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts || !e.is_network_level() || self.should_abort() {
                        return Err(e);
                    }

                    let delay = backoff_delay(&self.config.retry, attempt);
                    log_retry_attempt!(attempt, max_attempts, e);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Writes one record's outcome back to the store
    ///
    /// Every update is conditional on the record still being `pending`. A
    /// record another context already synced counts as a success.
    async fn apply_outcome(
        &self,
        record: &Record,
        outcome: UploadOutcome,
        submitter: Option<&str>,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let id = &record.meta.id;

        let (patch, failure) = match outcome {
            UploadOutcome::Synced(server_id) => {
                let mut patch = MetadataPatch::synced(server_id);
                patch.submitted_by = submitter.map(str::to_string);
                (patch, None)
            }
            UploadOutcome::Failed { reason, retryable } => {
                let retry_count = record.meta.retry_count.saturating_add(1);
                let parked = !retryable || retry_count > self.config.max_record_retries;
                let status = if parked {
                    RecordStatus::Failed
                } else {
                    RecordStatus::Pending
                };
                log_record_failure!(id, retry_count, reason, retryable);

                let failure = RecordFailure {
                    record_id: id.clone(),
                    health_id: record.meta.health_id.clone(),
                    reason: reason.clone(),
                    retry_count,
                    parked,
                };
                (MetadataPatch::failed_attempt(status, retry_count, reason), Some(failure))
            }
        };

        let update = match self
            .store
            .apply_metadata(id, RecordStatus::Pending, patch)
            .await
        {
            Ok(update) => update,
            Err(FieldSyncError::NotFound(_)) => {
                tracing::warn!(record_id = %id, "Record deleted during sync, outcome dropped");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match (update, failure) {
            (MetadataUpdate::Applied(meta), None) => {
                tracing::debug!(
                    record_id = %id,
                    server_id = ?meta.server_id.as_ref().map(|s| s.as_str()),
                    "Record synced"
                );
                summary.add_synced();
            }
            (MetadataUpdate::Applied(_), Some(failure)) => summary.add_failure(failure),
            (MetadataUpdate::StatusMismatch(meta), _) if meta.status == RecordStatus::Synced => {
                tracing::debug!(record_id = %id, "Record already synced by another context");
                summary.add_already_synced();
            }
            (MetadataUpdate::StatusMismatch(meta), _) => {
                tracing::warn!(
                    record_id = %id,
                    status = %meta.status,
                    "Record left pending during sync, outcome dropped"
                );
            }
        }
        Ok(())
    }

    fn is_offline(&self) -> bool {
        self.connectivity
            .as_ref()
            .map_or(false, |rx| !rx.borrow().online)
    }

    fn should_abort(&self) -> bool {
        let shutting_down = self.shutdown.as_ref().map_or(false, |rx| *rx.borrow());
        shutting_down || self.is_offline()
    }
}

/// Delay before retry number `attempt` (1-based)
pub(crate) fn backoff_delay(retry: &RetryConfig, attempt: usize) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let delay_ms = retry.initial_delay_ms as f64 * retry.backoff_multiplier.powi(exponent);
    Duration::from_millis((delay_ms as u64).min(retry.max_delay_ms))
}
