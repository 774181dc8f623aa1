//! Network status
//!
//! - [`link`] - device-reported link flag
//! - [`monitor`] - verified reachability and link quality

pub mod link;
pub mod monitor;

pub use link::{DeviceLink, ManualLink};
pub use monitor::{Connectivity, LinkQuality, NetworkMonitor};
