//! Remote collaborator abstraction
//!
//! The sync engine and the network monitor only see this trait, so tests can
//! script outcomes without a server.

use super::models::{BatchResponse, ListResponse, RemoteRecord};
use crate::config::SecretString;
use crate::domain::RemoteError;
use async_trait::async_trait;
use std::time::Duration;

/// Result type for remote calls; errors carry their retry classification
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The small REST contract the engine consumes
#[async_trait]
pub trait RemoteCollaborator: Send + Sync {
    /// Uploads one record and returns it with the server-assigned id
    async fn upload_record(
        &self,
        record: &RemoteRecord,
        token: Option<&SecretString>,
    ) -> RemoteResult<RemoteRecord>;

    /// Uploads several records in one exchange
    async fn upload_batch(
        &self,
        records: &[RemoteRecord],
        token: Option<&SecretString>,
    ) -> RemoteResult<BatchResponse>;

    /// Lists records already held remotely
    async fn list_records(
        &self,
        limit: usize,
        token: Option<&SecretString>,
    ) -> RemoteResult<ListResponse>;

    /// Probes the liveness endpoint and returns the round-trip time
    async fn health_check(&self, timeout: Duration) -> RemoteResult<Duration>;

    /// Server root the collaborator talks to
    fn base_url(&self) -> &str;
}
