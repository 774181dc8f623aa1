//! Engine context
//!
//! All shared state (store, remote client, connectivity, session) is built
//! once here and handed to each component explicitly. `shutdown` stops the
//! background tasks and closes the store.

use super::auth::{AuthGate, GateDecision, Session, SessionStore};
use super::background::AutoSync;
use super::identity::HealthIdGenerator;
use super::lifecycle::{validate_form, LifecycleManager, RecordForm};
use super::network::{DeviceLink, ManualLink, NetworkMonitor};
use super::sync::{SyncEngine, SyncOutcome};
use crate::adapters::remote::{HttpRemote, RemoteCollaborator};
use crate::adapters::store::{RecordStore, SqliteRecordStore};
use crate::config::FieldSyncConfig;
use crate::domain::{Record, Result, SubmissionMode};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Result of a submission that was stored
#[derive(Debug, Clone)]
pub struct Submission {
    pub record: Record,

    /// Set when an opportunistic sync pass ran right after saving
    pub sync: Option<SyncOutcome>,
}

/// Everything one execution context needs, wired together
pub struct EngineContext {
    config: FieldSyncConfig,
    store: Arc<dyn RecordStore>,
    remote: Arc<dyn RemoteCollaborator>,
    link: Arc<ManualLink>,
    monitor: Arc<NetworkMonitor>,
    sessions: SessionStore,
    lifecycle: LifecycleManager,
    engine: Arc<SyncEngine>,
    gate: AuthGate,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EngineContext {
    /// Opens the SQLite store and HTTP client from configuration and runs a
    /// first reachability check
    pub async fn init(config: FieldSyncConfig) -> Result<Self> {
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(&config.store).await?);
        let remote: Arc<dyn RemoteCollaborator> = Arc::new(HttpRemote::new(&config.remote)?);
        let context = Self::with_components(config, store, remote, Arc::new(ManualLink::default()));

        let connectivity = context.monitor.check_now().await;
        tracing::info!(
            online = connectivity.online,
            quality = %connectivity.quality,
            remote = %context.remote.base_url(),
            "Engine context initialized"
        );
        Ok(context)
    }

    /// Wires a context around existing components
    pub fn with_components(
        config: FieldSyncConfig,
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteCollaborator>,
        link: Arc<ManualLink>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let device_link: Arc<dyn DeviceLink> = link.clone();
        let monitor = Arc::new(NetworkMonitor::new(
            remote.clone(),
            device_link,
            config.network.clone(),
        ));
        let sessions = SessionStore::new(store.clone());
        let lifecycle = LifecycleManager::new(store.clone(), HealthIdGenerator::new(&config.identity));
        let engine = Arc::new(
            SyncEngine::new(store.clone(), remote.clone(), config.sync.clone())
                .with_connectivity(monitor.subscribe())
                .with_shutdown(shutdown_rx),
        );
        let gate = AuthGate::new(store.clone(), sessions.clone());

        Self {
            config,
            store,
            remote,
            link,
            monitor,
            sessions,
            lifecycle,
            engine,
            gate,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &FieldSyncConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<dyn RemoteCollaborator> {
        &self.remote
    }

    pub fn link(&self) -> &Arc<ManualLink> {
        &self.link
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Stores a submission, then syncs opportunistically when online
    ///
    /// An invalid form fails with
    /// [`FieldSyncError::Validation`](crate::domain::FieldSyncError::Validation)
    /// before anything is held or stored. Online without a session a valid
    /// form is held and
    /// [`FieldSyncError::AuthRequired`](crate::domain::FieldSyncError::AuthRequired)
    /// is returned.
    pub async fn submit(&self, form: RecordForm) -> Result<Submission> {
        validate_form(&form)?;

        let online = self.monitor.is_online();
        let record = match self.gate.evaluate(&form, online).await? {
            GateDecision::ProceedOffline => {
                self.lifecycle
                    .submit(&form, SubmissionMode::Offline, None)
                    .await?
            }
            GateDecision::ProceedOnline(session) => {
                self.lifecycle
                    .submit(&form, SubmissionMode::Online, Some(&session.user_id))
                    .await?
            }
        };

        let sync = if online && self.config.sync.auto_sync {
            match self.engine.run_pass().await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    // The record is safely stored; the next pass picks it up
                    tracing::warn!(error = %e, "Opportunistic sync after submit failed");
                    None
                }
            }
        } else {
            None
        };
        Ok(Submission { record, sync })
    }

    /// Stores the session and resumes a held submission, if there is one
    ///
    /// The held form is released only after the record has been stored.
    pub async fn resume_after_login(&self, session: Session) -> Result<Option<Submission>> {
        let Some(held) = self.gate.complete_authentication(&session).await? else {
            return Ok(None);
        };

        let submission = self.submit(held.form).await?;
        self.gate.release().await?;
        Ok(Some(submission))
    }

    /// Runs a sync pass now
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        self.engine.run_pass().await
    }

    /// Requeues every failed record; returns how many moved
    pub async fn requeue_failed(&self) -> Result<usize> {
        self.lifecycle.requeue_all_failed().await
    }

    /// Asks a running pass and the background tasks to stop early
    ///
    /// Records already settled stay settled; the rest remain queued.
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Starts the periodic reachability probe and connectivity-driven sync
    pub fn start_background_tasks(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !tasks.is_empty() {
            return;
        }

        tasks.push(tokio::spawn(
            self.monitor.clone().run(self.shutdown_tx.subscribe()),
        ));
        if self.config.sync.auto_sync {
            let auto = AutoSync::new(self.engine.clone());
            tasks.push(tokio::spawn(
                auto.run(self.monitor.subscribe(), self.shutdown_tx.subscribe()),
            ));
        }
        tracing::info!(tasks = tasks.len(), "Background tasks started");
    }

    /// Signals shutdown, waits for background tasks and closes the store
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);

        let tasks = match self.tasks.into_inner() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background task failed");
            }
        }

        self.store.close().await;
        tracing::info!("Engine context shut down");
    }
}
