//! External system integrations for fieldsync.
//!
//! - [`store`] - the local encrypted record store (SQLite)
//! - [`remote`] - the remote records API (HTTP)
//!
//! Both sit behind traits ([`store::RecordStore`], [`remote::RemoteCollaborator`])
//! so the core can be exercised with in-memory stores and scripted remotes.

pub mod remote;
pub mod store;
