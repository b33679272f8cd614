//! # Sync Module
//!
//! Reconciles the local add-request outbox with the UDJ server and keeps the
//! cached active playlist of an event current.
//!
//! ## Components
//!
//! - **Commands** (`command`): `SyncCommand`, `SyncOperation` and the validated `SyncTarget`
//! - **Synchronizer** (`synchronizer`): `PlaylistOutboxSynchronizer`, which runs one
//!   operation to completion and reports a `SyncOutcome`
//! - **Errors** (`error`): `SyncError` and its coarse `SyncErrorKind`

pub mod command;
pub mod error;
pub mod outcome;
pub mod synchronizer;

pub use command::{SyncCommand, SyncOperation, SyncTarget};
pub use error::{Result, SyncError, SyncErrorKind};
pub use outcome::SyncOutcome;
pub use synchronizer::PlaylistOutboxSynchronizer;
