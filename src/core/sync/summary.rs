//! Sync pass summary and reporting

use crate::domain::{HealthId, RecordId};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Which upload path a pass ended up using
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPath {
    /// Nothing was pending
    Nothing,
    Batch,
    /// Batch failed at the transport level and records went one at a time
    Individual,
}

impl fmt::Display for SyncPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPath::Nothing => "nothing",
            SyncPath::Batch => "batch",
            SyncPath::Individual => "individual",
        };
        f.write_str(s)
    }
}

/// One record that did not sync in this pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub record_id: RecordId,
    pub health_id: HealthId,

    /// Human-readable reason, as stored on the record
    pub reason: String,

    /// Retry count after this attempt
    pub retry_count: u32,

    /// True when the record was parked as `failed`; false when it stays
    /// `pending` for the next pass
    pub parked: bool,
}

/// Summary of one sync pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    /// Pending records picked up at the start of the pass
    pub total: usize,

    /// Records this pass moved to `synced`
    pub synced: usize,

    /// Records another context had already synced
    pub already_synced: usize,

    /// Records parked as `failed`
    pub failed: usize,

    /// Records left `pending` for a later pass
    pub retry_scheduled: usize,

    pub path: SyncPath,

    /// The pass stopped early because connectivity dropped or shutdown was
    /// requested
    pub aborted: bool,

    pub failures: Vec<RecordFailure>,

    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl SyncSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            synced: 0,
            already_synced: 0,
            failed: 0,
            retry_scheduled: 0,
            path: SyncPath::Nothing,
            aborted: false,
            failures: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub(crate) fn add_synced(&mut self) {
        self.synced += 1;
    }

    pub(crate) fn add_already_synced(&mut self) {
        self.already_synced += 1;
    }

    pub(crate) fn add_failure(&mut self, failure: RecordFailure) {
        if failure.parked {
            self.failed += 1;
        } else {
            self.retry_scheduled += 1;
        }
        self.failures.push(failure);
    }

    /// Records not touched because the pass stopped early
    pub fn untouched(&self) -> usize {
        self.total
            .saturating_sub(self.synced + self.already_synced + self.failed + self.retry_scheduled)
    }

    /// Every picked-up record ended up synced
    pub fn is_successful(&self) -> bool {
        self.synced + self.already_synced == self.total
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            synced = self.synced,
            already_synced = self.already_synced,
            failed = self.failed,
            retry_scheduled = self.retry_scheduled,
            untouched = self.untouched(),
            path = %self.path,
            aborted = self.aborted,
            duration_ms = self.duration.as_millis() as u64,
            "Sync pass summary"
        );

        for failure in &self.failures {
            tracing::warn!(
                record_id = %failure.record_id,
                health_id = %failure.health_id,
                retry_count = failure.retry_count,
                parked = failure.parked,
                reason = %failure.reason,
                "Record not synced"
            );
        }
    }
}

/// Result of asking for a sync pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Another pass was in flight; this call did nothing
    AlreadyRunning,

    /// No verified connectivity
    Offline,

    Completed(SyncSummary),
}

impl SyncOutcome {
    pub fn summary(&self) -> Option<&SyncSummary> {
        match self {
            SyncOutcome::Completed(summary) => Some(summary),
            _ => None,
        }
    }

    /// Number of records this call moved to `synced`
    pub fn synced(&self) -> usize {
        self.summary().map_or(0, |s| s.synced)
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(parked: bool) -> RecordFailure {
        RecordFailure {
            record_id: RecordId::generate(),
            health_id: HealthId::new("CHR20240315AZ9Q1").unwrap(),
            reason: "age out of range".to_string(),
            retry_count: 1,
            parked,
        }
    }

    #[test]
    fn test_counts_and_success() {
        let mut summary = SyncSummary::new(5);
        summary.add_synced();
        summary.add_synced();
        summary.add_already_synced();
        summary.add_failure(failure(true));
        summary.add_failure(failure(false));

        assert!(!summary.is_successful());
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.retry_scheduled, 1);
        assert_eq!(summary.untouched(), 0);

        let mut clean = SyncSummary::new(2);
        clean.add_synced();
        clean.add_already_synced();
        assert!(clean.is_successful());
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(SyncOutcome::AlreadyRunning).unwrap();
        assert_eq!(json["outcome"], "already_running");

        let completed = SyncOutcome::Completed(
            SyncSummary::new(0).with_duration(Duration::from_millis(1500)),
        );
        let json = serde_json::to_value(&completed).unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["duration"], 1500);
        assert_eq!(completed.synced(), 0);
    }
}
