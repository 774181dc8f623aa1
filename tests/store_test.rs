//! Integration tests for the encrypted SQLite store on disk

mod common;

use common::{form, test_config};
use fieldsync::adapters::store::{RecordFilter, RecordStore, SqliteRecordStore};
use fieldsync::config::secret_string;
use fieldsync::core::identity::HealthIdGenerator;
use fieldsync::core::lifecycle::LifecycleManager;
use fieldsync::domain::{FieldSyncError, RecordStatus, SubmissionMode};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("records.db").to_string_lossy());

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(&config.store).await.unwrap());
    let lifecycle = LifecycleManager::new(store.clone(), HealthIdGenerator::default());
    let stored = lifecycle
        .submit(&form("Asha Devi"), SubmissionMode::Offline, None)
        .await
        .unwrap();
    store.close().await;

    let reopened = SqliteRecordStore::open(&config.store).await.unwrap();
    let record = reopened.get(&stored.meta.id).await.unwrap().unwrap();

    assert_eq!(record, stored);
    assert_eq!(record.sensitive.child_name, "Asha Devi");
    assert_eq!(record.meta.status, RecordStatus::Pending);
    reopened.close().await;
}

#[tokio::test]
async fn test_sensitive_fields_never_hit_disk_in_clear() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("records.db");
    let config = test_config(&db_path.to_string_lossy());

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(&config.store).await.unwrap());
    let lifecycle = LifecycleManager::new(store.clone(), HealthIdGenerator::default());
    let mut f = form("Zenobia Quixotic");
    f.guardian_name = "Bartholomew Xylander".to_string();
    lifecycle.submit(&f, SubmissionMode::Offline, None).await.unwrap();
    store.close().await;

    let mut raw = std::fs::read(&db_path).unwrap();
    for suffix in ["-wal", "-shm"] {
        if let Ok(bytes) = std::fs::read(format!("{}{suffix}", db_path.display())) {
            raw.extend(bytes);
        }
    }
    let haystack = String::from_utf8_lossy(&raw);
    assert!(!haystack.contains("Zenobia Quixotic"));
    assert!(!haystack.contains("Bartholomew Xylander"));
}

#[tokio::test]
async fn test_wrong_key_is_reported_not_masked() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir.path().join("records.db").to_string_lossy());

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(&config.store).await.unwrap());
    let lifecycle = LifecycleManager::new(store.clone(), HealthIdGenerator::default());
    let stored = lifecycle
        .submit(&form("Asha"), SubmissionMode::Offline, None)
        .await
        .unwrap();
    store.close().await;

    config.store.encryption_key = secret_string("not-the-same-key".to_string());
    let reopened = SqliteRecordStore::open(&config.store).await.unwrap();

    let err = reopened.get(&stored.meta.id).await.unwrap_err();
    assert!(matches!(err, FieldSyncError::Decryption(_)));

    // Clear-text metadata is still readable without the key
    assert_eq!(reopened.count(&RecordFilter::all()).await.unwrap(), 1);
    let meta = reopened.get_metadata(&stored.meta.id).await.unwrap().unwrap();
    assert_eq!(meta.health_id, stored.meta.health_id);
    reopened.close().await;
}

#[tokio::test]
async fn test_health_id_uniqueness_check() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir.path().join("records.db").to_string_lossy());
    config.identity.check_local_uniqueness = true;

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(&config.store).await.unwrap());
    let lifecycle = LifecycleManager::new(store.clone(), HealthIdGenerator::new(&config.identity));

    let mut seen = std::collections::HashSet::new();
    for _ in 0..20 {
        let record = lifecycle
            .submit(&form("Asha"), SubmissionMode::Offline, None)
            .await
            .unwrap();
        assert!(store.health_id_exists(&record.meta.health_id).await.unwrap());
        assert!(seen.insert(record.meta.health_id.to_string()));
    }
    store.close().await;
}
