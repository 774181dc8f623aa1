//! Wire models for the remote records API
//!
//! All payloads are camelCase JSON. Sensitive fields travel in clear; the
//! transport is expected to be TLS.

use crate::domain::{Record, RecordId, ServerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record as sent to and returned by the remote side
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    /// Local record id, echoed back so outcomes can be matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_id: Option<String>,

    /// Server-assigned id; some deployments return it as `_id`
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    #[serde(default)]
    pub child_name: String,

    #[serde(default)]
    pub guardian_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub observations: serde_json::Value,

    #[serde(default)]
    pub consent: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_mode: Option<String>,

    /// Identity of the field worker, taken from the active session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RemoteRecord {
    /// Builds the wire form of a local record
    pub fn from_record(record: &Record, submitted_by: Option<&str>) -> Self {
        let meta = &record.meta;
        Self {
            local_id: Some(meta.id.to_string()),
            health_id: Some(meta.health_id.to_string()),
            server_id: meta.server_id.as_ref().map(|s| s.to_string()),
            child_name: record.sensitive.child_name.clone(),
            guardian_name: record.sensitive.guardian_name.clone(),
            age: meta.details.age,
            gender: meta.details.gender.clone(),
            weight_kg: meta.details.weight_kg,
            height_cm: meta.details.height_cm,
            location: meta.details.location.clone(),
            photo: record.sensitive.photo.clone(),
            observations: record.sensitive.observations.clone(),
            consent: meta.consent,
            submission_mode: Some(meta.submission_mode.to_string()),
            submitted_by: submitted_by
                .map(str::to_string)
                .or_else(|| meta.submitted_by.clone()),
            created_at: Some(meta.timestamps.created_at),
        }
    }

    /// Local id this entry refers to, if the server echoed it
    pub fn record_id(&self) -> Option<RecordId> {
        self.local_id
            .as_deref()
            .and_then(|id| RecordId::new(id).ok())
    }

    /// Server-assigned id, if present and non-empty
    pub fn assigned_server_id(&self) -> Option<ServerId> {
        self.server_id
            .as_deref()
            .and_then(|id| ServerId::new(id).ok())
    }
}

/// `POST /api/children/batch` body
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest<'a> {
    pub records: &'a [RemoteRecord],
}

/// One rejected entry in a batch response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchFailure {
    pub record: RemoteRecord,

    /// Server-supplied reason
    pub error: String,

    /// Whether resending unchanged may succeed; absent means a content rejection
    #[serde(default)]
    pub retryable: Option<bool>,
}

/// `POST /api/children/batch` response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub successful: Vec<RemoteRecord>,

    #[serde(default)]
    pub failed: Vec<BatchFailure>,

    #[serde(default)]
    pub total: usize,
}

/// `GET /api/children` response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub data: Vec<RemoteRecord>,

    #[serde(default)]
    pub pagination: serde_json::Value,

    #[serde(default)]
    pub success: bool,
}
