//! Core logic for fieldsync.
//!
//! # Modules
//!
//! - [`identity`] - health ID generation
//! - [`lifecycle`] - record creation, validation and user-initiated transitions
//! - [`network`] - verified reachability and link quality
//! - [`auth`] - login identifiers, sessions and the submission auth gate
//! - [`sync`] - batch-then-fallback sync engine
//! - [`background`] - connectivity-driven and detached sync triggers
//! - [`context`] - explicit wiring of all of the above
//!
//! # Flow
//!
//! 1. **Gate**: an online submission without a session is held until sign-in
//! 2. **Store**: the record is validated and saved locally as `pending`
//! 3. **Sync**: when connectivity is verified, pending records are uploaded
//!    in one batch, or one by one if the batch fails in transit
//! 4. **Settle**: each record ends `synced`, stays `pending` for a retry, or
//!    is parked as `failed` with the server's reason
//!
//! # Example
//!
//! ```rust,no_run
//! use fieldsync::config::load_config;
//! use fieldsync::core::context::EngineContext;
//! use fieldsync::core::lifecycle::RecordForm;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fieldsync.toml")?;
//! let context = EngineContext::init(config).await?;
//!
//! let form = RecordForm {
//!     child_name: "Asha".to_string(),
//!     guardian_name: "Meera".to_string(),
//!     age: Some(3),
//!     consent: true,
//!     ..RecordForm::default()
//! };
//! let submission = context.submit(form).await?;
//! println!("Stored {}", submission.record.meta.health_id);
//!
//! context.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod background;
pub mod context;
pub mod identity;
pub mod lifecycle;
pub mod network;
pub mod sync;
