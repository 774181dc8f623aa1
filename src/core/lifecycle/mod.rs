//! Record lifecycle
//!
//! - [`form`] - form state entered by a field worker
//! - [`validation`] - required-field and consent gate
//! - [`manager`] - user-initiated transitions

pub mod form;
pub mod manager;
pub mod validation;

pub use form::RecordForm;
pub use manager::LifecycleManager;
pub use validation::validate_form;
