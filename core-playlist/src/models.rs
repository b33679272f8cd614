//! Domain model for add requests and the active playlist cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PlaylistError;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Local identifier of an add request, assigned by the store.
    RequestId
);

id_newtype!(
    /// Identifier of a track in the remote library (`lib_id` on the wire).
    LibraryTrackId
);

id_newtype!(
    /// Identifier of a UDJ event. Valid ids are non-negative.
    EventId
);

impl EventId {
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

/// Requests awaiting submission, keyed by request id.
///
/// Ordered so the submitted payload is deterministic.
pub type PendingBatch = BTreeMap<RequestId, LibraryTrackId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    NeedsSync,
    Synced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::NeedsSync => "needs_sync",
            SyncStatus::Synced => "synced",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = PlaylistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needs_sync" => Ok(SyncStatus::NeedsSync),
            "synced" => Ok(SyncStatus::Synced),
            other => Err(PlaylistError::InvalidData(format!(
                "Invalid sync status: {}",
                other
            ))),
        }
    }
}

/// A user's locally queued intent to add a track to an event's playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRequest {
    pub request_id: RequestId,
    pub event_id: EventId,
    pub library_track_id: LibraryTrackId,
    pub sync_status: SyncStatus,
    /// Incremented before every submission attempt
    pub submission_attempts: u32,
    /// Unix seconds of the latest attempt
    pub last_attempt_at: Option<i64>,
    pub created_at: i64,
}

/// One track in an event's active playlist, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub library_track_id: LibraryTrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_secs: i64,
    pub upvotes: u32,
    pub downvotes: u32,
    /// Server timestamp string, stored verbatim
    pub time_added: String,
    pub adder_id: i64,
    pub adder_username: String,
}

impl PlaylistEntry {
    /// Minimal entry used by tests and fixtures.
    pub fn new(library_track_id: LibraryTrackId, title: impl Into<String>) -> Self {
        Self {
            library_track_id,
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            duration_secs: 0,
            upvotes: 0,
            downvotes: 0,
            time_added: String::new(),
            adder_id: 0,
            adder_username: String::new(),
        }
    }
}
