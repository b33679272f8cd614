//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the UDJ sync crates:
//! - Logging and tracing initialization with ticket redaction
//! - `CoreConfig` builder with bridge defaults
//! - Event bus for auth, sync and playlist notifications
//!
//! Higher crates (`core-auth`, `core-sync`, `core-service`) depend on this one
//! for the event types they emit and the configuration they are built from.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
