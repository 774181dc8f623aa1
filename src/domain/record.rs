//! Record domain model
//!
//! A record is one health observation collected in the field. Its payload is
//! split in two: [`SensitiveFields`] is only ever persisted encrypted, while
//! everything in [`RecordMetadata`] stays in clear so listing and counting
//! never need the key.

use super::ids::{HealthId, RecordId, ServerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a record
///
/// Allowed transitions: `draft -> pending`, `pending -> synced`,
/// `pending -> failed`, `failed -> pending`. `synced` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Still being edited; invisible to the sync engine
    Draft,
    /// Validated locally, waiting for the remote collaborator
    Pending,
    /// Confirmed by the remote collaborator
    Synced,
    /// Parked after exhausting retries or a remote rejection
    Failed,
}

impl RecordStatus {
    /// Returns the status as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Pending => "pending",
            RecordStatus::Synced => "synced",
            RecordStatus::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is part of the state machine
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        matches!(
            (self, next),
            (RecordStatus::Draft, RecordStatus::Pending)
                | (RecordStatus::Pending, RecordStatus::Synced)
                | (RecordStatus::Pending, RecordStatus::Failed)
                | (RecordStatus::Failed, RecordStatus::Pending)
        )
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Synced)
    }

    /// All statuses, in lifecycle order
    pub fn all() -> [RecordStatus; 4] {
        [
            RecordStatus::Draft,
            RecordStatus::Pending,
            RecordStatus::Synced,
            RecordStatus::Failed,
        ]
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(RecordStatus::Draft),
            "pending" => Ok(RecordStatus::Pending),
            "synced" => Ok(RecordStatus::Synced),
            "failed" => Ok(RecordStatus::Failed),
            other => Err(format!("Unknown record status: {other}")),
        }
    }
}

/// How the record was submitted; fixed at creation, used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    Online,
    Offline,
}

impl SubmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionMode::Online => "online",
            SubmissionMode::Offline => "offline",
        }
    }
}

impl fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(SubmissionMode::Online),
            "offline" => Ok(SubmissionMode::Offline),
            other => Err(format!("Unknown submission mode: {other}")),
        }
    }
}

/// Fields that are only persisted encrypted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensitiveFields {
    /// Child's full name
    pub child_name: String,

    /// Parent or guardian name
    pub guardian_name: String,

    /// Photo as a data URL or base64 blob
    #[serde(default)]
    pub photo: Option<String>,

    /// Free-text and structured health observations
    #[serde(default)]
    pub observations: serde_json::Value,
}

/// Non-sensitive measurements, stored in clear
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChildDetails {
    /// Age in years
    #[serde(default)]
    pub age: Option<u32>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub weight_kg: Option<f64>,

    #[serde(default)]
    pub height_cm: Option<f64>,

    /// Village, ward or facility where the record was collected
    #[serde(default)]
    pub location: Option<String>,
}

/// Record timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Set once at creation
    pub created_at: DateTime<Utc>,

    /// Bumped on every mutation
    pub updated_at: DateTime<Utc>,

    /// Set once, on transition to `synced`
    pub synced_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Timestamps for a record created at `now`
    pub fn created(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            synced_at: None,
        }
    }
}

/// Clear-text part of a record
///
/// This is everything the store can index and return without touching the
/// encryption key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub id: RecordId,
    pub health_id: HealthId,
    pub server_id: Option<ServerId>,
    pub status: RecordStatus,
    pub submission_mode: SubmissionMode,
    pub retry_count: u32,

    /// Human-readable reason for the last failed sync attempt
    pub last_error: Option<String>,

    pub consent: bool,
    pub details: ChildDetails,

    /// Identity of the field worker who submitted the record
    pub submitted_by: Option<String>,

    pub timestamps: Timestamps,
}

/// A complete record: metadata plus decrypted sensitive fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub meta: RecordMetadata,
    pub sensitive: SensitiveFields,
}

impl Record {
    pub fn id(&self) -> &RecordId {
        &self.meta.id
    }

    pub fn health_id(&self) -> &HealthId {
        &self.meta.health_id
    }

    pub fn status(&self) -> RecordStatus {
        self.meta.status
    }

    /// Moves the record to `next`, enforcing the lifecycle state machine
    ///
    /// Bumps `updated_at`; stamps `synced_at` on the transition to synced.
    pub fn transition(&mut self, next: RecordStatus, now: DateTime<Utc>) -> Result<(), String> {
        if !self.meta.status.can_transition_to(next) {
            return Err(format!(
                "cannot move record {} from {} to {}",
                self.meta.id, self.meta.status, next
            ));
        }

        self.meta.status = next;
        self.meta.timestamps.updated_at = now;
        if next == RecordStatus::Synced && self.meta.timestamps.synced_at.is_none() {
            self.meta.timestamps.synced_at = Some(now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sample_record(status: RecordStatus) -> Record {
        let now = Utc::now();
        Record {
            meta: RecordMetadata {
                id: RecordId::generate(),
                health_id: HealthId::new("CHR20240315AZ9Q1").unwrap(),
                server_id: None,
                status,
                submission_mode: SubmissionMode::Offline,
                retry_count: 0,
                last_error: None,
                consent: true,
                details: ChildDetails::default(),
                submitted_by: None,
                timestamps: Timestamps::created(now),
            },
            sensitive: SensitiveFields::default(),
        }
    }

    #[test_case(RecordStatus::Draft, RecordStatus::Pending, true ; "draft to pending")]
    #[test_case(RecordStatus::Pending, RecordStatus::Synced, true ; "pending to synced")]
    #[test_case(RecordStatus::Pending, RecordStatus::Failed, true ; "pending to failed")]
    #[test_case(RecordStatus::Failed, RecordStatus::Pending, true ; "failed to pending")]
    #[test_case(RecordStatus::Draft, RecordStatus::Synced, false ; "draft to synced")]
    #[test_case(RecordStatus::Draft, RecordStatus::Failed, false ; "draft to failed")]
    #[test_case(RecordStatus::Pending, RecordStatus::Draft, false ; "pending to draft")]
    #[test_case(RecordStatus::Synced, RecordStatus::Pending, false ; "synced to pending")]
    #[test_case(RecordStatus::Synced, RecordStatus::Failed, false ; "synced to failed")]
    #[test_case(RecordStatus::Failed, RecordStatus::Synced, false ; "failed to synced")]
    #[test_case(RecordStatus::Pending, RecordStatus::Pending, false ; "pending to pending")]
    fn test_transition_table(from: RecordStatus, to: RecordStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_synced_has_no_exits() {
        for next in RecordStatus::all() {
            assert!(!RecordStatus::Synced.can_transition_to(next));
        }
        assert!(RecordStatus::Synced.is_terminal());
    }

    #[test]
    fn test_transition_stamps_synced_at_once() {
        let mut record = sample_record(RecordStatus::Pending);
        let first = Utc::now();
        record.transition(RecordStatus::Synced, first).unwrap();
        assert_eq!(record.meta.timestamps.synced_at, Some(first));
        assert_eq!(record.meta.timestamps.updated_at, first);
    }

    #[test]
    fn test_invalid_transition_leaves_record_untouched() {
        let mut record = sample_record(RecordStatus::Draft);
        let before = record.clone();
        assert!(record.transition(RecordStatus::Synced, Utc::now()).is_err());
        assert_eq!(record, before);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in RecordStatus::all() {
            assert_eq!(RecordStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(RecordStatus::from_str("archived").is_err());
    }

    #[test]
    fn test_submission_mode_serde() {
        let json = serde_json::to_string(&SubmissionMode::Offline).unwrap();
        assert_eq!(json, "\"offline\"");
    }
}
