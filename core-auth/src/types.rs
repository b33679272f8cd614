use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a UDJ account as known to the host application.
///
/// Usually the username; the core treats it as opaque and only uses it to
/// key tickets and serialize sign-in prompts.
///
/// # Examples
///
/// ```
/// use core_auth::AccountId;
///
/// let account = AccountId::new("dj_kurtis");
/// assert_eq!(account.as_str(), "dj_kurtis");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the identifier is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Session ticket issued by the UDJ `auth` endpoint.
///
/// # Security
///
/// The `Debug` implementation never prints the hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Value sent in the `X-Udj-Ticket-Hash` header
    pub ticket_hash: String,
    /// Server-side id of the signed-in user
    pub user_id: i64,
    /// When the ticket was obtained
    pub issued_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(ticket_hash: impl Into<String>, user_id: i64) -> Self {
        Self {
            ticket_hash: ticket_hash.into(),
            user_id,
            issued_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("ticket_hash", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Username and password collected from the user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Login reply body: `{"ticket_hash": "...", "user_id": 7}`.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub ticket_hash: String,
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_blank() {
        assert!(AccountId::new("  ").is_blank());
        assert!(!AccountId::from("dj").is_blank());
        assert_eq!(AccountId::from("dj".to_string()).to_string(), "dj");
    }

    #[test]
    fn test_ticket_debug_redacts_hash() {
        let ticket = Ticket::new("9f86d081884c7d65", 12);
        let rendered = format!("{:?}", ticket);

        assert!(!rendered.contains("9f86d081884c7d65"));
        assert!(rendered.contains("user_id: 12"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("dj", "hunter2");
        assert!(!format!("{:?}", credentials).contains("hunter2"));
    }

    #[test]
    fn test_auth_response_parses_server_reply() {
        let reply: AuthResponse =
            serde_json::from_str(r#"{"ticket_hash": "abc", "user_id": 3}"#).unwrap();
        assert_eq!(reply.ticket_hash, "abc");
        assert_eq!(reply.user_id, 3);
    }
}
