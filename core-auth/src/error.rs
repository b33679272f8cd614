use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The server answered `401` to the login request.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The user dismissed the credential prompt or the caller cancelled.
    #[error("Authentication cancelled")]
    Cancelled,

    #[error("Operation timed out: {operation}")]
    OperationTimeout { operation: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    /// The auth endpoint replied with something other than a ticket.
    #[error("Unexpected auth response (status {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Stored ticket for account {account_id} is corrupted: {reason}")]
    TicketCorrupted { account_id: String, reason: String },

    #[error("Authenticator unavailable: {0}")]
    AuthenticatorUnavailable(String),

    #[error("Auth error: {0}")]
    Other(String),
}

impl AuthError {
    /// Whether re-triggering the operation later may succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::OperationTimeout { .. }
                | AuthError::NetworkError(_)
                | AuthError::UnexpectedResponse { .. }
                | AuthError::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
