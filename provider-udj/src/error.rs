//! Error types for the UDJ provider

use bridge_traits::error::BridgeError;
use core_playlist::PlaylistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UdjError {
    /// `401`: ticket missing, expired or revoked
    #[error("Ticket rejected by server: {0}")]
    TicketRejected(String),

    #[error("UDJ API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to build request: {0}")]
    RequestError(String),
}

pub type Result<T> = std::result::Result<T, UdjError>;

/// Only failures where no response arrived count as network errors. A bridge
/// that is missing or refuses the request is a request error.
impl From<BridgeError> for UdjError {
    fn from(error: BridgeError) -> Self {
        if error.is_transport() {
            UdjError::NetworkError(error.to_string())
        } else {
            UdjError::RequestError(error.to_string())
        }
    }
}

impl From<UdjError> for PlaylistError {
    fn from(error: UdjError) -> Self {
        match error {
            UdjError::TicketRejected(msg) => PlaylistError::AuthRejected(msg),
            UdjError::NetworkError(msg) => PlaylistError::Network(msg),
            UdjError::ApiError {
                status_code,
                message,
            } => PlaylistError::Protocol(format!(
                "unexpected status {}: {}",
                status_code, message
            )),
            UdjError::ParseError(msg) => PlaylistError::Protocol(msg),
            UdjError::RequestError(msg) => PlaylistError::Protocol(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = UdjError::ApiError {
            status_code: 404,
            message: "event not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "UDJ API error (status 404): event not found"
        );
    }

    #[test]
    fn test_error_conversion() {
        assert!(matches!(
            PlaylistError::from(UdjError::TicketRejected("expired".to_string())),
            PlaylistError::AuthRejected(_)
        ));
        assert!(matches!(
            PlaylistError::from(UdjError::NetworkError("refused".to_string())),
            PlaylistError::Network(_)
        ));
        assert!(matches!(
            PlaylistError::from(UdjError::ParseError("eof".to_string())),
            PlaylistError::Protocol(_)
        ));
    }

    #[test]
    fn test_bridge_error_classification() {
        assert!(matches!(
            UdjError::from(BridgeError::Timeout("30s".to_string())),
            UdjError::NetworkError(_)
        ));
        assert!(matches!(
            UdjError::from(BridgeError::ConnectionFailed("refused".to_string())),
            UdjError::NetworkError(_)
        ));
        assert!(matches!(
            UdjError::from(BridgeError::NotAvailable("no http bridge".to_string())),
            UdjError::RequestError(_)
        ));
    }
}
