//! Sync commands as received from the host trigger.

use crate::error::{Result, SyncError};
use core_auth::AccountId;
use core_playlist::EventId;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Operation requested by a trigger.
///
/// Parsed from the wire names `SYNC_ADD_REQUESTS` and `REFRESH_PLAYLIST`.
/// Anything else is kept as [`SyncOperation::Unknown`] and ignored on dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncOperation {
    SyncAddRequests,
    RefreshPlaylist,
    Unknown(String),
}

impl SyncOperation {
    pub fn as_str(&self) -> &str {
        match self {
            SyncOperation::SyncAddRequests => "SYNC_ADD_REQUESTS",
            SyncOperation::RefreshPlaylist => "REFRESH_PLAYLIST",
            SyncOperation::Unknown(name) => name,
        }
    }
}

impl FromStr for SyncOperation {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "SYNC_ADD_REQUESTS" => SyncOperation::SyncAddRequests,
            "REFRESH_PLAYLIST" => SyncOperation::RefreshPlaylist,
            other => SyncOperation::Unknown(other.to_string()),
        })
    }
}

impl From<&str> for SyncOperation {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(operation) => operation,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The account and event a sync operation works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncTarget {
    pub account_id: AccountId,
    pub event_id: EventId,
}

impl SyncTarget {
    pub fn new(account_id: impl Into<AccountId>, event_id: EventId) -> Self {
        Self {
            account_id: account_id.into(),
            event_id,
        }
    }

    /// Rejects blank accounts and negative event ids.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.is_blank() {
            return Err(SyncError::InvalidArgument(
                "account id must not be blank".to_string(),
            ));
        }
        if !self.event_id.is_valid() {
            return Err(SyncError::InvalidArgument(format!(
                "event id must be non-negative, got {}",
                self.event_id
            )));
        }
        Ok(())
    }
}

/// A single trigger: which operation, for which account and event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    pub operation: SyncOperation,
    pub account_id: AccountId,
    /// Optional on the wire; required by every known operation.
    pub event_id: Option<EventId>,
}

impl SyncCommand {
    pub fn new(
        operation: impl Into<SyncOperation>,
        account_id: impl Into<AccountId>,
        event_id: Option<EventId>,
    ) -> Self {
        Self {
            operation: operation.into(),
            account_id: account_id.into(),
            event_id,
        }
    }

    pub fn sync_add_requests(account_id: impl Into<AccountId>, event_id: EventId) -> Self {
        Self::new(SyncOperation::SyncAddRequests, account_id, Some(event_id))
    }

    pub fn refresh_playlist(account_id: impl Into<AccountId>, event_id: EventId) -> Self {
        Self::new(SyncOperation::RefreshPlaylist, account_id, Some(event_id))
    }

    /// Validated target of this command.
    pub fn target(&self) -> Result<SyncTarget> {
        let event_id = self.event_id.ok_or_else(|| {
            SyncError::InvalidArgument(format!("{} requires an event id", self.operation))
        })?;

        let target = SyncTarget {
            account_id: self.account_id.clone(),
            event_id,
        };
        target.validate()?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncErrorKind;

    #[test]
    fn test_operation_parsing() {
        assert_eq!(
            SyncOperation::from("SYNC_ADD_REQUESTS"),
            SyncOperation::SyncAddRequests
        );
        assert_eq!(
            SyncOperation::from("REFRESH_PLAYLIST"),
            SyncOperation::RefreshPlaylist
        );
        assert_eq!(
            SyncOperation::from("refresh_playlist"),
            SyncOperation::Unknown("refresh_playlist".to_string())
        );
        assert_eq!(SyncOperation::RefreshPlaylist.to_string(), "REFRESH_PLAYLIST");
    }

    #[test]
    fn test_target_requires_event_id() {
        let command = SyncCommand::new("SYNC_ADD_REQUESTS", "alice", None);
        let err = command.target().unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::InvalidArgument);
        assert!(err.to_string().contains("SYNC_ADD_REQUESTS"));
    }

    #[test]
    fn test_target_rejects_negative_event_id() {
        let command = SyncCommand::refresh_playlist("alice", EventId(-1));
        assert_eq!(
            command.target().unwrap_err().kind(),
            SyncErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_target_rejects_blank_account() {
        let command = SyncCommand::refresh_playlist("  ", EventId(1));
        assert!(matches!(
            command.target(),
            Err(SyncError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_valid_target() {
        let target = SyncCommand::sync_add_requests("alice", EventId(0))
            .target()
            .unwrap();
        assert_eq!(target, SyncTarget::new("alice", EventId(0)));
    }
}
