//! Integration tests for the detached background worker
//!
//! The worker opens its own connection to the same database file and talks
//! to the foreground only through its channels.

mod common;

use common::{form, test_config};
use fieldsync::adapters::store::{RecordStore, SqliteRecordStore};
use fieldsync::core::background::{BackgroundWorker, WorkerEvent, WorkerMessage};
use fieldsync::core::identity::HealthIdGenerator;
use fieldsync::core::lifecycle::LifecycleManager;
use fieldsync::domain::{RecordStatus, SubmissionMode};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_worker_syncs_records_written_by_foreground() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("fieldsync.db");
    let mut config = test_config(&db_path.to_string_lossy());

    let mut server = mockito::Server::new_async().await;
    config.remote.base_url = server.url();

    // Foreground context stores a record
    let foreground: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::open(&config.store).await.unwrap());
    let lifecycle = LifecycleManager::new(foreground.clone(), HealthIdGenerator::default());
    let record = lifecycle
        .submit(&form("Asha"), SubmissionMode::Offline, None)
        .await
        .unwrap();

    let health = server
        .mock("GET", "/health")
        .with_status(200)
        .expect_at_least(1)
        .create_async()
        .await;
    let batch = server
        .mock("POST", "/api/children/batch")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"successful": [{{"localId": "{}", "_id": "srv-1"}}], "failed": [], "total": 1}}"#,
            record.meta.id
        ))
        .create_async()
        .await;

    let worker = BackgroundWorker::spawn(&config, "sync-records").await.unwrap();
    let mut messages = worker.subscribe();
    let handle = worker.handle();

    assert!(handle.send(WorkerEvent::Sync { tag: "sync-records".to_string() }).await);
    let message = tokio::time::timeout(Duration::from_secs(5), messages.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        message,
        WorkerMessage::SyncCompleted {
            tag: "sync-records".to_string(),
            synced: 1
        }
    );
    batch.assert_async().await;
    health.assert_async().await;

    // Visible from the foreground connection
    let meta = foreground.get_metadata(&record.meta.id).await.unwrap().unwrap();
    assert_eq!(meta.status, RecordStatus::Synced);
    assert_eq!(meta.server_id.unwrap().as_str(), "srv-1");

    worker.shutdown().await;
    foreground.close().await;
}

#[tokio::test]
async fn test_worker_reports_failure_without_crashing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("fieldsync.db");
    let mut config = test_config(&db_path.to_string_lossy());
    config.store.encryption_key = fieldsync::config::secret_string("another-passphrase".to_string());

    // Written under a different key: the worker cannot decrypt it
    let other_key = test_config(&db_path.to_string_lossy());
    let foreground: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::open(&other_key.store).await.unwrap());
    let lifecycle = LifecycleManager::new(foreground.clone(), HealthIdGenerator::default());
    let record = lifecycle
        .submit(&form("Asha"), SubmissionMode::Offline, None)
        .await
        .unwrap();

    let mut server = mockito::Server::new_async().await;
    config.remote.base_url = server.url();
    server
        .mock("GET", "/health")
        .with_status(200)
        .create_async()
        .await;

    let worker = BackgroundWorker::spawn(&config, "sync-records").await.unwrap();
    let mut messages = worker.subscribe();
    assert!(worker.handle().send(WorkerEvent::ConnectivityRestored).await);

    let message = tokio::time::timeout(Duration::from_secs(5), messages.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(message, WorkerMessage::SyncCompleted { synced: 0, .. }));

    // Parked with the decryption reason rather than uploaded
    let meta = foreground.get_metadata(&record.meta.id).await.unwrap().unwrap();
    assert_eq!(meta.status, RecordStatus::Failed);
    assert!(meta.last_error.unwrap().contains("Decryption"));

    worker.shutdown().await;
    foreground.close().await;
}

#[tokio::test]
async fn test_worker_leaves_records_untouched_when_remote_unreachable() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("fieldsync.db");
    let mut config = test_config(&db_path.to_string_lossy());
    config.remote.base_url = "http://127.0.0.1:1".to_string();

    let foreground: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::open(&config.store).await.unwrap());
    let lifecycle = LifecycleManager::new(foreground.clone(), HealthIdGenerator::default());
    let record = lifecycle
        .submit(&form("Asha"), SubmissionMode::Offline, None)
        .await
        .unwrap();

    let worker = BackgroundWorker::spawn(&config, "sync-records").await.unwrap();
    let mut messages = worker.subscribe();
    let handle = worker.handle();

    for _ in 0..4 {
        assert!(handle.send(WorkerEvent::Sync { tag: "sync-records".to_string() }).await);
        let message = tokio::time::timeout(Duration::from_secs(5), messages.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            message,
            WorkerMessage::Offline {
                tag: "sync-records".to_string()
            }
        );
    }

    // No retry budget spent on a remote that was never reachable
    let meta = foreground.get_metadata(&record.meta.id).await.unwrap().unwrap();
    assert_eq!(meta.status, RecordStatus::Pending);
    assert_eq!(meta.retry_count, 0);
    assert!(meta.last_error.is_none());

    worker.shutdown().await;
    foreground.close().await;
}
