//! Remote collaborator integration
//!
//! - [`traits`] - the [`RemoteCollaborator`] contract
//! - [`client`] - reqwest-based [`HttpRemote`]
//! - [`models`] - camelCase wire types

pub mod client;
pub mod models;
pub mod traits;

pub use client::HttpRemote;
pub use models::{BatchFailure, BatchRequest, BatchResponse, ListResponse, RemoteRecord};
pub use traits::{RemoteCollaborator, RemoteResult};
