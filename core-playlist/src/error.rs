use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A stored row could not be mapped back to the domain model.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Transport-level failure reaching the server.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered, but not with what the protocol expects.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server rejected the ticket (`401`).
    #[error("Server rejected ticket: {0}")]
    AuthRejected(String),
}

pub type Result<T> = std::result::Result<T, PlaylistError>;
