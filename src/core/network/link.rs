//! Link-layer connectivity flag
//!
//! A link being up says nothing about whether the remote side is reachable;
//! the monitor only uses it to skip probes while the link is down.

use std::sync::atomic::{AtomicBool, Ordering};

/// Source of the device-reported online flag
pub trait DeviceLink: Send + Sync {
    fn is_up(&self) -> bool;
}

/// A link flag toggled by the caller
///
/// Used by the CLI worker (which has no OS hook) and by tests that simulate
/// the device dropping off the network.
#[derive(Debug)]
pub struct ManualLink {
    up: AtomicBool,
}

impl ManualLink {
    pub fn new(up: bool) -> Self {
        Self {
            up: AtomicBool::new(up),
        }
    }

    pub fn set(&self, up: bool) {
        let previous = self.up.swap(up, Ordering::SeqCst);
        if previous != up {
            tracing::debug!(link_up = up, "Device link flag changed");
        }
    }
}

impl Default for ManualLink {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DeviceLink for ManualLink {
    fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}
