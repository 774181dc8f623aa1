//! Incremental progress reporting
//!
//! Both the batch path and the per-record fallback publish the same
//! `completed / total` shape, so a caller renders progress the same way
//! whichever path is active.

use serde::Serialize;
use tokio::sync::watch;

/// Which stage a sync pass is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Batch,
    Individual,
    Finished,
}

/// Snapshot of a running pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub completed: usize,
    pub total: usize,
    pub phase: SyncPhase,
}

impl SyncProgress {
    pub fn idle() -> Self {
        Self {
            completed: 0,
            total: 0,
            phase: SyncPhase::Idle,
        }
    }

    /// Completion percentage; an empty pass counts as complete
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }
}

/// Writes progress to a watch channel
#[derive(Debug)]
pub(crate) struct ProgressReporter<'a> {
    tx: &'a watch::Sender<SyncProgress>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn start(tx: &'a watch::Sender<SyncProgress>, total: usize, phase: SyncPhase) -> Self {
        tx.send_replace(SyncProgress {
            completed: 0,
            total,
            phase,
        });
        Self { tx }
    }

    /// Switches path without losing the completed count
    pub(crate) fn phase(&self, phase: SyncPhase) {
        self.tx.send_modify(|p| p.phase = phase);
    }

    pub(crate) fn advance(&self) {
        self.tx.send_modify(|p| p.completed = (p.completed + 1).min(p.total));
    }

    pub(crate) fn finish(&self) {
        self.tx.send_modify(|p| p.phase = SyncPhase::Finished);
    }
}
