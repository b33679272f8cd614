//! Workspace umbrella crate.
//!
//! Host applications depend on `udj-workspace` and get the `core-service`
//! façade re-exported under the `desktop-shims` feature, without wiring each
//! crate of the sync core individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
