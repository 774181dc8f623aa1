//! Reachability monitor
//!
//! The device flag is believed when it says offline. When it says online,
//! the monitor probes the remote liveness endpoint before reporting
//! connectivity, and classifies the link by probe latency.

use super::link::DeviceLink;
use crate::adapters::remote::RemoteCollaborator;
use crate::config::NetworkConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Link quality derived from probe latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkQuality {
    Offline,
    Poor,
    Moderate,
    Good,
}

impl fmt::Display for LinkQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkQuality::Offline => "offline",
            LinkQuality::Poor => "poor",
            LinkQuality::Moderate => "moderate",
            LinkQuality::Good => "good",
        };
        f.write_str(s)
    }
}

/// Last verified connectivity state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connectivity {
    /// True only after a successful probe
    pub online: bool,
    pub quality: LinkQuality,

    /// Round trip of the last successful probe
    pub latency_ms: Option<u64>,

    pub checked_at: DateTime<Utc>,
}

impl Connectivity {
    /// State before anything has been checked
    pub fn unknown() -> Self {
        Self::offline(Utc::now())
    }

    fn offline(at: DateTime<Utc>) -> Self {
        Self {
            online: false,
            quality: LinkQuality::Offline,
            latency_ms: None,
            checked_at: at,
        }
    }
}

/// Publishes verified connectivity on a watch channel
pub struct NetworkMonitor {
    remote: Arc<dyn RemoteCollaborator>,
    link: Arc<dyn DeviceLink>,
    config: NetworkConfig,
    state: watch::Sender<Connectivity>,
}

impl NetworkMonitor {
    pub fn new(
        remote: Arc<dyn RemoteCollaborator>,
        link: Arc<dyn DeviceLink>,
        config: NetworkConfig,
    ) -> Self {
        let (state, _) = watch::channel(Connectivity::unknown());
        Self {
            remote,
            link,
            config,
            state,
        }
    }

    /// Whether the last check verified reachability
    pub fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    pub fn current(&self) -> Connectivity {
        self.state.borrow().clone()
    }

    /// Receives every change in online state or link quality
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Checks reachability now and publishes the result
    pub async fn check_now(&self) -> Connectivity {
        let now = Utc::now();
        let next = if !self.link.is_up() {
            Connectivity::offline(now)
        } else {
            let timeout = Duration::from_millis(self.config.probe_timeout_ms);
            match self.remote.health_check(timeout).await {
                Ok(latency) => Connectivity {
                    online: true,
                    quality: self.classify(latency),
                    latency_ms: Some(latency.as_millis() as u64),
                    checked_at: now,
                },
                Err(e) => {
                    tracing::debug!(error = %e, "Reachability probe failed");
                    Connectivity::offline(now)
                }
            }
        };

        self.publish(next.clone());
        next
    }

    /// Marks the device offline without probing
    ///
    /// Used when the link layer reports a drop.
    pub fn mark_offline(&self) {
        self.publish(Connectivity::offline(Utc::now()));
    }

    /// Maps probe latency to a quality bucket
    pub fn classify(&self, latency: Duration) -> LinkQuality {
        let ms = latency.as_millis() as u64;
        if ms <= self.config.good_latency_ms {
            LinkQuality::Good
        } else if ms <= self.config.poor_latency_ms {
            LinkQuality::Moderate
        } else {
            LinkQuality::Poor
        }
    }

    fn publish(&self, next: Connectivity) {
        self.state.send_if_modified(|current| {
            let changed = current.online != next.online || current.quality != next.quality;
            if current.online != next.online {
                if next.online {
                    tracing::info!(
                        quality = %next.quality,
                        latency_ms = next.latency_ms,
                        "Connectivity verified"
                    );
                } else {
                    tracing::warn!("Connectivity lost");
                }
            } else if changed {
                tracing::debug!(quality = %next.quality, "Link quality changed");
            }
            *current = next;
            changed
        });
    }

    /// Probes on a fixed interval until `shutdown` flips to true
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.probe_interval_seconds));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.check_now().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Network monitor stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::remote::{BatchResponse, ListResponse, RemoteRecord, RemoteResult};
    use crate::config::SecretString;
    use crate::core::network::ManualLink;
    use crate::domain::RemoteError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct ProbeOnly {
        healthy: AtomicBool,
        latency: Duration,
        probes: AtomicUsize,
    }

    impl ProbeOnly {
        fn new(healthy: bool, latency_ms: u64) -> Self {
            Self {
                healthy: AtomicBool::new(healthy),
                latency: Duration::from_millis(latency_ms),
                probes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteCollaborator for ProbeOnly {
        async fn upload_record(
            &self,
            _record: &RemoteRecord,
            _token: Option<&SecretString>,
        ) -> RemoteResult<RemoteRecord> {
            unreachable!("monitor never uploads")
        }

        async fn upload_batch(
            &self,
            _records: &[RemoteRecord],
            _token: Option<&SecretString>,
        ) -> RemoteResult<BatchResponse> {
            unreachable!("monitor never uploads")
        }

        async fn list_records(
            &self,
            _limit: usize,
            _token: Option<&SecretString>,
        ) -> RemoteResult<ListResponse> {
            unreachable!("monitor never lists")
        }

        async fn health_check(&self, _timeout: Duration) -> RemoteResult<Duration> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.healthy.load(Ordering::SeqCst) {
                Ok(self.latency)
            } else {
                Err(RemoteError::Network("connection refused".to_string()))
            }
        }

        fn base_url(&self) -> &str {
            "http://probe.test"
        }
    }

    fn monitor(remote: Arc<ProbeOnly>, link: Arc<ManualLink>) -> NetworkMonitor {
        NetworkMonitor::new(remote, link, NetworkConfig::default())
    }

    #[tokio::test]
    async fn test_starts_offline_until_probed() {
        let remote = Arc::new(ProbeOnly::new(true, 50));
        let monitor = monitor(remote.clone(), Arc::new(ManualLink::new(true)));
        assert!(!monitor.is_online());

        let state = monitor.check_now().await;
        assert!(state.online);
        assert_eq!(state.quality, LinkQuality::Good);
        assert!(monitor.is_online());
        assert_eq!(remote.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_link_down_skips_probe() {
        let remote = Arc::new(ProbeOnly::new(true, 50));
        let monitor = monitor(remote.clone(), Arc::new(ManualLink::new(false)));

        let state = monitor.check_now().await;
        assert!(!state.online);
        assert_eq!(remote.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_link_up_but_unreachable_is_offline() {
        let remote = Arc::new(ProbeOnly::new(false, 50));
        let monitor = monitor(remote, Arc::new(ManualLink::new(true)));
        assert!(!monitor.check_now().await.online);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions_only() {
        let remote = Arc::new(ProbeOnly::new(true, 50));
        let link = Arc::new(ManualLink::new(true));
        let monitor = monitor(remote, link.clone());
        let mut rx = monitor.subscribe();

        monitor.check_now().await;
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().online);

        // Same state again: no wake-up
        monitor.check_now().await;
        assert!(!rx.has_changed().unwrap());

        link.set(false);
        monitor.check_now().await;
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().online);
    }

    #[test]
    fn test_classify_latency() {
        let monitor = monitor(
            Arc::new(ProbeOnly::new(true, 0)),
            Arc::new(ManualLink::default()),
        );
        assert_eq!(monitor.classify(Duration::from_millis(100)), LinkQuality::Good);
        assert_eq!(monitor.classify(Duration::from_millis(300)), LinkQuality::Good);
        assert_eq!(monitor.classify(Duration::from_millis(900)), LinkQuality::Moderate);
        assert_eq!(monitor.classify(Duration::from_millis(4000)), LinkQuality::Poor);
    }
}
