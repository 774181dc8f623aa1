//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use fieldsync::adapters::remote::{
    BatchFailure, BatchResponse, ListResponse, RemoteCollaborator, RemoteRecord, RemoteResult,
};
use fieldsync::adapters::store::{FieldCipher, RecordStore, SqliteRecordStore};
use fieldsync::config::{FieldSyncConfig, SecretString};
use fieldsync::core::lifecycle::RecordForm;
use fieldsync::domain::RemoteError;
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Configuration with delays shrunk for tests
pub fn test_config(store_path: &str) -> FieldSyncConfig {
    let toml = format!(
        r#"
[remote]
base_url = "http://localhost:5000"

[store]
path = "{store_path}"
encryption_key = "integration-test-passphrase"

[sync]
max_record_retries = 3
inter_request_delay_ms = 0

[sync.retry]
max_attempts = 2
initial_delay_ms = 1
max_delay_ms = 5
backoff_multiplier = 2.0

[logging]
local_enabled = false
"#
    );
    let config: FieldSyncConfig = toml::from_str(&toml).unwrap();
    config.validate().unwrap();
    config
}

pub async fn memory_store() -> Arc<dyn RecordStore> {
    Arc::new(
        SqliteRecordStore::open_with_cipher(":memory:", FieldCipher::new([42u8; 32]))
            .await
            .unwrap(),
    )
}

pub fn form(child: &str) -> RecordForm {
    RecordForm {
        child_name: child.to_string(),
        guardian_name: "Meera".to_string(),
        age: Some(3),
        weight_kg: Some(12.4),
        location: Some("Ward 7".to_string()),
        consent: true,
        ..RecordForm::default()
    }
}

/// Remote collaborator whose behaviour is set per test
///
/// Records whose child name is in `reject_names` are refused as content
/// errors, both in batches and one by one.
#[derive(Default)]
pub struct ScriptedRemote {
    pub batch_error: Mutex<Option<RemoteError>>,
    pub record_error: Mutex<Option<RemoteError>>,
    pub reject_names: Mutex<Vec<String>>,
    pub batch_delay: Mutex<Duration>,
    pub unreachable: AtomicBool,
    pub batch_calls: AtomicUsize,
    pub record_calls: AtomicUsize,
    pub health_calls: AtomicUsize,
    pub accepted: Mutex<Vec<RemoteRecord>>,
    pub tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_batches_with(&self, error: RemoteError) {
        *self.batch_error.lock().unwrap() = Some(error);
    }

    pub fn fail_records_with(&self, error: RemoteError) {
        *self.record_error.lock().unwrap() = Some(error);
    }

    pub fn reject(&self, child_name: &str) {
        self.reject_names.lock().unwrap().push(child_name.to_string());
    }

    pub fn set_batch_delay(&self, delay: Duration) {
        *self.batch_delay.lock().unwrap() = delay;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn accepted_names(&self) -> Vec<String> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.child_name.clone())
            .collect()
    }

    fn is_rejected(&self, record: &RemoteRecord) -> bool {
        self.reject_names
            .lock()
            .unwrap()
            .iter()
            .any(|n| *n == record.child_name)
    }

    fn accept(&self, record: &RemoteRecord) -> RemoteRecord {
        let mut created = record.clone();
        created.server_id = Some(format!(
            "srv-{}",
            record.local_id.clone().unwrap_or_default()
        ));
        self.accepted.lock().unwrap().push(created.clone());
        created
    }

    fn note_token(&self, token: Option<&SecretString>) {
        self.tokens
            .lock()
            .unwrap()
            .push(token.map(|t| t.expose_secret().as_str().to_string()));
    }
}

#[async_trait]
impl RemoteCollaborator for ScriptedRemote {
    async fn upload_record(
        &self,
        record: &RemoteRecord,
        token: Option<&SecretString>,
    ) -> RemoteResult<RemoteRecord> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        self.note_token(token);

        if let Some(err) = self.record_error.lock().unwrap().clone() {
            return Err(err);
        }
        if self.is_rejected(record) {
            return Err(RemoteError::Rejected {
                status: 422,
                reason: format!("{} is not a valid child name", record.child_name),
            });
        }
        Ok(self.accept(record))
    }

    async fn upload_batch(
        &self,
        records: &[RemoteRecord],
        token: Option<&SecretString>,
    ) -> RemoteResult<BatchResponse> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.note_token(token);

        let delay = *self.batch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.batch_error.lock().unwrap().clone() {
            return Err(err);
        }

        let mut response = BatchResponse {
            successful: Vec::new(),
            failed: Vec::new(),
            total: records.len(),
        };
        for record in records {
            if self.is_rejected(record) {
                response.failed.push(BatchFailure {
                    record: record.clone(),
                    error: format!("{} is not a valid child name", record.child_name),
                    retryable: None,
                });
            } else {
                response.successful.push(self.accept(record));
            }
        }
        Ok(response)
    }

    async fn list_records(
        &self,
        limit: usize,
        _token: Option<&SecretString>,
    ) -> RemoteResult<ListResponse> {
        Ok(ListResponse {
            data: self.accepted.lock().unwrap().iter().take(limit).cloned().collect(),
            pagination: serde_json::Value::Null,
            success: true,
        })
    }

    async fn health_check(&self, _timeout: Duration) -> RemoteResult<Duration> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            Err(RemoteError::Network("connection refused".to_string()))
        } else {
            Ok(Duration::from_millis(40))
        }
    }

    fn base_url(&self) -> &str {
        "http://scripted.test"
    }
}

/// Polls `check` until it holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
