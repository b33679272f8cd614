//! # Playlist Module
//!
//! Local state of the UDJ client and the contracts around it:
//!
//! - the add-request outbox (`add_requests` table) with its sync status and
//!   submission markers
//! - the cached active playlist of each event
//! - [`PendingRequestStore`], implemented on SQLite by [`SqlitePendingRequestStore`]
//! - [`PlaylistServerClient`], the remote API implemented by `provider-udj`

pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod server;

pub use error::{PlaylistError, Result};
pub use models::{
    AddRequest, EventId, LibraryTrackId, PendingBatch, PlaylistEntry, RequestId, SyncStatus,
};
pub use repository::{PendingRequestStore, SqlitePendingRequestStore};
pub use server::PlaylistServerClient;
