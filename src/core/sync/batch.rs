//! Per-record outcomes of an upload
//!
//! A batch response is matched back to the local records by `localId`,
//! falling back to `healthId` for servers that do not echo local ids.

use crate::adapters::remote::BatchResponse;
use crate::domain::{Record, RemoteError, ServerId};
use std::collections::HashMap;

/// Reason stored on a record the server left out of its batch response
pub const MISSING_FROM_RESPONSE: &str = "record missing from batch response";

/// What happened to one record
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Accepted by the remote side
    Synced(Option<ServerId>),

    /// Not accepted; `retryable` false means the content was rejected
    Failed { reason: String, retryable: bool },
}

impl UploadOutcome {
    /// Classifies a transport or server error for one record
    pub fn from_error(err: &RemoteError) -> Self {
        UploadOutcome::Failed {
            reason: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Produces one outcome per record, in the order of `records`
///
/// A record reported as both successful and failed counts as successful.
/// Entries matching no local record are logged and ignored.
pub fn match_batch_response(records: &[Record], response: BatchResponse) -> Vec<UploadOutcome> {
    let by_local: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.meta.id.as_str(), i))
        .collect();
    let by_health: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.meta.health_id.as_str(), i))
        .collect();

    let locate = |local_id: Option<&str>, health_id: Option<&str>| -> Option<usize> {
        local_id
            .and_then(|id| by_local.get(id).copied())
            .or_else(|| health_id.and_then(|id| by_health.get(id).copied()))
    };

    let mut outcomes: Vec<Option<UploadOutcome>> = vec![None; records.len()];

    for entry in &response.successful {
        match locate(entry.local_id.as_deref(), entry.health_id.as_deref()) {
            Some(i) => outcomes[i] = Some(UploadOutcome::Synced(entry.assigned_server_id())),
            None => tracing::warn!(
                local_id = ?entry.local_id,
                health_id = ?entry.health_id,
                "Batch response lists an unknown successful record"
            ),
        }
    }

    for failure in &response.failed {
        let record = &failure.record;
        match locate(record.local_id.as_deref(), record.health_id.as_deref()) {
            Some(i) if outcomes[i].is_none() => {
                outcomes[i] = Some(UploadOutcome::Failed {
                    reason: failure.error.clone(),
                    retryable: failure.retryable.unwrap_or(false),
                });
            }
            Some(_) => {}
            None => tracing::warn!(
                local_id = ?record.local_id,
                health_id = ?record.health_id,
                error = %failure.error,
                "Batch response lists an unknown failed record"
            ),
        }
    }

    outcomes
        .into_iter()
        .map(|o| {
            o.unwrap_or_else(|| UploadOutcome::Failed {
                reason: MISSING_FROM_RESPONSE.to_string(),
                retryable: true,
            })
        })
        .collect()
}
