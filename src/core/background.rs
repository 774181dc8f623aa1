//! Background sync trigger
//!
//! Foreground and background contexts run the same pass through
//! [`SyncRunner`]; they differ only in what triggers it. [`AutoSync`] reacts
//! to verified connectivity coming back. [`BackgroundWorker`] owns its own
//! store and engine, and talks to the foreground only through an event
//! channel in and a broadcast channel out.

use super::network::{Connectivity, DeviceLink, ManualLink, NetworkMonitor};
use super::sync::{SyncEngine, SyncOutcome};
use crate::adapters::remote::{HttpRemote, RemoteCollaborator};
use crate::adapters::store::{RecordStore, SqliteRecordStore};
use crate::config::FieldSyncConfig;
use crate::domain::Result;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// Anything that can run one sync pass
#[async_trait]
pub trait SyncRunner: Send + Sync {
    async fn run_pass(&self) -> Result<SyncOutcome>;
}

#[async_trait]
impl SyncRunner for SyncEngine {
    async fn run_pass(&self) -> Result<SyncOutcome> {
        SyncEngine::run_pass(self).await
    }
}

type PassFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs a pass whenever connectivity goes from offline to verified online
pub struct AutoSync {
    runner: Arc<dyn SyncRunner>,
}

impl AutoSync {
    pub fn new(runner: Arc<dyn SyncRunner>) -> Self {
        Self { runner }
    }

    /// Listens until `shutdown` flips to true or the connectivity sender is
    /// dropped
    ///
    /// The starting state is read when this is called, not when the returned
    /// future is first polled, so a transition in between still triggers.
    /// Transitions keep being observed while a pass runs; a reconnect seen
    /// during a pass queues exactly one follow-up pass.
    pub fn run(
        self,
        mut connectivity: watch::Receiver<Connectivity>,
        mut shutdown: watch::Receiver<bool>,
    ) -> impl Future<Output = ()> + Send + 'static {
        let mut was_online = connectivity.borrow_and_update().online;

        async move {
            let mut pass: Option<PassFuture> = None;
            let mut rerun = false;

            loop {
                tokio::select! {
                    changed = connectivity.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = connectivity.borrow_and_update().online;
                        if online && !was_online {
                            if pass.is_some() {
                                tracing::debug!("Connectivity restored during a pass, queueing another");
                                rerun = true;
                            } else {
                                tracing::info!("Connectivity restored, starting automatic sync");
                                pass = Some(self.start_pass());
                            }
                        }
                        was_online = online;
                    }
                    _ = wait_for_pass(&mut pass), if pass.is_some() => {
                        pass = None;
                        if std::mem::take(&mut rerun) && was_online {
                            pass = Some(self.start_pass());
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            // The engine sees the same shutdown signal and stops at the next record
            wait_for_pass(&mut pass).await;
            tracing::debug!("Automatic sync stopped");
        }
    }

    fn start_pass(&self) -> PassFuture {
        let runner = self.runner.clone();
        Box::pin(async move {
            match runner.run_pass().await {
                Ok(outcome) => tracing::debug!(synced = outcome.synced(), "Automatic sync finished"),
                Err(e) => tracing::error!(error = %e, "Automatic sync failed"),
            }
        })
    }
}

async fn wait_for_pass(pass: &mut Option<PassFuture>) {
    if let Some(running) = pass.as_mut() {
        running.await;
    }
}

/// Verifies reachability before every pass
///
/// An unreachable remote leaves the engine's connectivity offline, so the
/// pass returns [`SyncOutcome::Offline`] without touching any record.
struct ProbedRunner {
    monitor: Arc<NetworkMonitor>,
    engine: SyncEngine,
}

#[async_trait]
impl SyncRunner for ProbedRunner {
    async fn run_pass(&self) -> Result<SyncOutcome> {
        self.monitor.check_now().await;
        self.engine.run_pass().await
    }
}

/// Messages the foreground sends to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A named sync event; ignored unless the tag matches the registration
    Sync { tag: String },

    /// The device came back online while the foreground was inactive
    ConnectivityRestored,

    Shutdown,
}

/// Messages the worker broadcasts to any listening foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    SyncCompleted { tag: String, synced: usize },
    SyncFailed { tag: String, reason: String },

    /// The remote could not be reached; nothing was uploaded
    Offline { tag: String },
}

const EVENT_BUFFER: usize = 16;
const MESSAGE_BUFFER: usize = 64;

/// Cloneable sender side for a running worker
#[derive(Clone)]
pub struct WorkerHandle {
    events: mpsc::Sender<WorkerEvent>,
    messages: broadcast::Sender<WorkerMessage>,
}

impl WorkerHandle {
    /// Delivers an event; returns false when the worker has stopped
    pub async fn send(&self, event: WorkerEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkerMessage> {
        self.messages.subscribe()
    }
}

/// Detached sync context registered for one sync tag
pub struct BackgroundWorker {
    handle: WorkerHandle,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BackgroundWorker {
    /// Opens a private store, client and reachability monitor and starts
    /// listening for `tag`
    pub async fn spawn(config: &FieldSyncConfig, tag: impl Into<String>) -> Result<Self> {
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(&config.store).await?);
        let remote: Arc<dyn RemoteCollaborator> = Arc::new(HttpRemote::new(&config.remote)?);
        let link: Arc<dyn DeviceLink> = Arc::new(ManualLink::default());
        Ok(Self::spawn_with_components(config, store, remote, link, tag))
    }

    /// Starts a worker around its own store and remote
    ///
    /// The worker probes reachability itself before each pass and on
    /// `network.probe_interval_seconds`; a pass aborts its fallback uploads
    /// when a probe fails or [`shutdown`](Self::shutdown) is called.
    pub fn spawn_with_components(
        config: &FieldSyncConfig,
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteCollaborator>,
        link: Arc<dyn DeviceLink>,
        tag: impl Into<String>,
    ) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let monitor = Arc::new(NetworkMonitor::new(
            remote.clone(),
            link,
            config.network.clone(),
        ));
        let engine = SyncEngine::new(store.clone(), remote, config.sync.clone())
            .with_connectivity(monitor.subscribe())
            .with_shutdown(stop_rx.clone());

        let probe = tokio::spawn(monitor.clone().run(stop_rx));
        let runner = Arc::new(ProbedRunner { monitor, engine });
        let (handle, inner) = start_loop(runner, tag.into());

        // Stop probing and close the private pool once the loop has ended
        let task = tokio::spawn(async move {
            let _ = inner.await;
            probe.abort();
            let _ = probe.await;
            store.close().await;
        });
        Self { handle, stop, task }
    }

    /// Starts the worker loop around an existing runner
    pub fn spawn_with_runner(runner: Arc<dyn SyncRunner>, tag: impl Into<String>) -> Self {
        let (stop, _) = watch::channel(false);
        let (handle, task) = start_loop(runner, tag.into());
        Self { handle, stop, task }
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkerMessage> {
        self.handle.subscribe()
    }

    /// Stops a running pass at the next record, then waits for the worker
    pub async fn shutdown(self) {
        self.stop.send_replace(true);
        let _ = self.handle.events.send(WorkerEvent::Shutdown).await;
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::error!(error = %e, "Background worker task failed");
            }
        }
    }
}

fn start_loop(runner: Arc<dyn SyncRunner>, tag: String) -> (WorkerHandle, JoinHandle<()>) {
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (messages_tx, _) = broadcast::channel(MESSAGE_BUFFER);

    let task = tokio::spawn(worker_loop(runner, tag.clone(), events_rx, messages_tx.clone()));
    tracing::info!(tag = %tag, "Background sync worker registered");

    let handle = WorkerHandle {
        events: events_tx,
        messages: messages_tx,
    };
    (handle, task)
}

async fn worker_loop(
    runner: Arc<dyn SyncRunner>,
    tag: String,
    mut events: mpsc::Receiver<WorkerEvent>,
    messages: broadcast::Sender<WorkerMessage>,
) {
    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Shutdown => break,
            WorkerEvent::Sync { tag: requested } if requested != tag => {
                tracing::debug!(tag = %requested, registered = %tag, "Ignoring unregistered sync tag");
                continue;
            }
            WorkerEvent::Sync { .. } | WorkerEvent::ConnectivityRestored => {}
        }

        let message = match runner.run_pass().await {
            Ok(SyncOutcome::Completed(summary)) => WorkerMessage::SyncCompleted {
                tag: tag.clone(),
                synced: summary.synced,
            },
            Ok(SyncOutcome::AlreadyRunning) => WorkerMessage::SyncCompleted {
                tag: tag.clone(),
                synced: 0,
            },
            Ok(SyncOutcome::Offline) => {
                tracing::info!(tag = %tag, "Remote unreachable, records stay queued");
                WorkerMessage::Offline { tag: tag.clone() }
            }
            Err(e) => {
                tracing::error!(tag = %tag, error = %e, "Background sync failed");
                WorkerMessage::SyncFailed {
                    tag: tag.clone(),
                    reason: e.to_string(),
                }
            }
        };

        // No listening foreground is fine
        let _ = messages.send(message);
    }
    tracing::info!(tag = %tag, "Background sync worker stopped");
}
