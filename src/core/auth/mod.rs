//! Authentication
//!
//! - [`login`] - tagged login identifiers and their resolvers
//! - [`session`] - sessions persisted in the encrypted settings blob
//! - [`gate`] - submission-time auth gate with form holding

pub mod gate;
pub mod login;
pub mod session;

pub use gate::{AuthGate, GateDecision, HeldSubmission};
pub use login::LoginMethod;
pub use session::{Session, SessionStore};
