//! Domain models and types for fieldsync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`RecordId`], [`HealthId`], [`ServerId`])
//! - **The record model** ([`Record`], [`RecordMetadata`], [`SensitiveFields`])
//!   and its status state machine ([`RecordStatus`])
//! - **Error types** ([`FieldSyncError`], [`ValidationError`],
//!   [`DecryptionError`], [`RemoteError`], [`AuthRequiredError`])
//! - **Result type alias** ([`Result`])
//!
//! # Status transitions
//!
//! ```rust
//! use fieldsync::domain::RecordStatus;
//!
//! assert!(RecordStatus::Draft.can_transition_to(RecordStatus::Pending));
//! assert!(RecordStatus::Failed.can_transition_to(RecordStatus::Pending));
//! assert!(!RecordStatus::Synced.can_transition_to(RecordStatus::Pending));
//! ```

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{
    AuthRequiredError, DecryptionError, FieldSyncError, RemoteError, ValidationError,
};
pub use ids::{HealthId, HealthIdParts, RecordId, ServerId};
pub use record::{
    ChildDetails, Record, RecordMetadata, RecordStatus, SensitiveFields, SubmissionMode,
    Timestamps,
};
pub use result::Result;
