//! Sync engine
//!
//! - [`engine`] - single-flight pass with batch-then-fallback uploads
//! - [`batch`] - matching upload responses to local records
//! - [`progress`] - `completed / total` progress on a watch channel
//! - [`summary`] - pass summary and outcome

pub mod batch;
pub mod engine;
pub mod progress;
pub mod summary;

pub use batch::{match_batch_response, UploadOutcome};
pub use engine::SyncEngine;
pub use progress::{SyncPhase, SyncProgress};
pub use summary::{RecordFailure, SyncOutcome, SyncPath, SyncSummary};
