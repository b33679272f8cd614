use core_auth::AuthError;
use core_playlist::PlaylistError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse failure category reported to callers and in `SyncEvent::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SyncErrorKind {
    AuthFailure,
    NetworkFailure,
    ProtocolFailure,
    LocalStoreFailure,
    InvalidArgument,
}

impl SyncErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorKind::AuthFailure => "AuthFailure",
            SyncErrorKind::NetworkFailure => "NetworkFailure",
            SyncErrorKind::ProtocolFailure => "ProtocolFailure",
            SyncErrorKind::LocalStoreFailure => "LocalStoreFailure",
            SyncErrorKind::InvalidArgument => "InvalidArgument",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    /// No usable token: cancelled, timed out, rejected or unavailable.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network failure: {0}")]
    Network(String),

    /// The server replied with something the protocol does not allow.
    #[error("Protocol failure: {0}")]
    Protocol(String),

    #[error("Local store failure: {0}")]
    LocalStore(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Auth(_) => SyncErrorKind::AuthFailure,
            SyncError::Network(_) => SyncErrorKind::NetworkFailure,
            SyncError::Protocol(_) => SyncErrorKind::ProtocolFailure,
            SyncError::LocalStore(_) => SyncErrorKind::LocalStoreFailure,
            SyncError::InvalidArgument(_) => SyncErrorKind::InvalidArgument,
        }
    }
}

impl From<AuthError> for SyncError {
    fn from(error: AuthError) -> Self {
        SyncError::Auth(error.to_string())
    }
}

impl From<PlaylistError> for SyncError {
    fn from(error: PlaylistError) -> Self {
        match error {
            PlaylistError::Database(_)
            | PlaylistError::Migration(_)
            | PlaylistError::InvalidData(_) => SyncError::LocalStore(error.to_string()),
            PlaylistError::Network(msg) => SyncError::Network(msg),
            PlaylistError::Protocol(msg) => SyncError::Protocol(msg),
            PlaylistError::AuthRejected(msg) => SyncError::Auth(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
