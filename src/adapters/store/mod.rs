//! Local encrypted record store
//!
//! - [`traits`] - the [`RecordStore`] contract shared by every context
//! - [`sqlite`] - SQLite implementation
//! - [`cipher`] - AES-256-GCM field encryption

pub mod cipher;
pub mod sqlite;
pub mod traits;

pub use cipher::FieldCipher;
pub use sqlite::SqliteRecordStore;
pub use traits::{HeldForm, MetadataPatch, MetadataUpdate, RecordFilter, RecordStore};
