//! UDJ API request and response bodies.

use serde::{Deserialize, Serialize};

/// `GET events/{id}/active_playlist`
#[derive(Debug, Deserialize)]
pub struct ActivePlaylistResponse {
    pub active_playlist: Vec<QueuedSong>,
}

/// One entry of the active playlist.
#[derive(Debug, Deserialize)]
pub struct QueuedSong {
    pub song: LibrarySong,
    #[serde(default)]
    pub upvoters: Vec<UdjUser>,
    #[serde(default)]
    pub downvoters: Vec<UdjUser>,
    pub time_added: String,
    pub adder: UdjUser,
}

#[derive(Debug, Deserialize)]
pub struct LibrarySong {
    pub id: i64,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Seconds
    pub duration: i64,
}

#[derive(Debug, Deserialize)]
pub struct UdjUser {
    pub id: i64,
    #[serde(default)]
    pub username: String,
}

/// Element of the `PUT events/{id}/active_playlist/songs` body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AddSongRequest {
    pub lib_id: i64,
    /// Lets the server recognize a resubmitted request
    pub client_request_id: i64,
}
