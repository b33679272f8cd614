//! Per-account ticket persistence on top of the host `SecureStore`.
//!
//! Tickets are serialized as a small JSON record under `udj_ticket:<account>`.
//! The ticket hash itself is never logged.

use std::sync::Arc;

use bridge_traits::error::BridgeError;
use bridge_traits::storage::SecureStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AuthError, Result};
use crate::types::{AccountId, Ticket};

#[derive(Clone)]
pub struct TicketStore {
    vault: Arc<dyn SecureStore>,
}

/// On-disk shape. `issued_at` is Unix seconds.
#[derive(Serialize, Deserialize)]
struct TicketRecord {
    ticket_hash: String,
    user_id: i64,
    issued_at: i64,
}

impl From<&Ticket> for TicketRecord {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_hash: ticket.ticket_hash.clone(),
            user_id: ticket.user_id,
            issued_at: ticket.issued_at.timestamp(),
        }
    }
}

impl From<TicketRecord> for Ticket {
    fn from(record: TicketRecord) -> Self {
        Self {
            ticket_hash: record.ticket_hash,
            user_id: record.user_id,
            issued_at: DateTime::<Utc>::from_timestamp(record.issued_at, 0)
                .unwrap_or_else(Utc::now),
        }
    }
}

fn key_for(account_id: &AccountId) -> String {
    format!("udj_ticket:{account_id}")
}

fn unavailable(account_id: &AccountId, action: &str, err: BridgeError) -> AuthError {
    warn!(%account_id, error = %err, "secure store failed to {action} ticket");
    AuthError::SecureStorageUnavailable(err.to_string())
}

impl TicketStore {
    pub fn new(vault: Arc<dyn SecureStore>) -> Self {
        Self { vault }
    }

    /// Persist `ticket`, replacing any earlier one for the account.
    pub async fn store_ticket(&self, account_id: &AccountId, ticket: &Ticket) -> Result<()> {
        let record = serde_json::to_vec(&TicketRecord::from(ticket))
            .map_err(|e| AuthError::Other(format!("cannot encode ticket: {e}")))?;
        self.vault
            .set_secret(&key_for(account_id), &record)
            .await
            .map_err(|e| unavailable(account_id, "write", e))?;
        debug!(%account_id, user_id = ticket.user_id, "ticket persisted");
        Ok(())
    }

    /// `Ok(None)` when the account has never signed in or was signed out.
    ///
    /// An unreadable record is removed before [`AuthError::TicketCorrupted`]
    /// is returned, so the following attempt falls back to prompting.
    pub async fn retrieve_ticket(&self, account_id: &AccountId) -> Result<Option<Ticket>> {
        let key = key_for(account_id);
        let Some(bytes) = self
            .vault
            .get_secret(&key)
            .await
            .map_err(|e| unavailable(account_id, "read", e))?
        else {
            return Ok(None);
        };

        match serde_json::from_slice::<TicketRecord>(&bytes) {
            Ok(record) => Ok(Some(record.into())),
            Err(parse_err) => {
                warn!(%account_id, error = %parse_err, "discarding unreadable ticket");
                if let Err(e) = self.vault.delete_secret(&key).await {
                    warn!(%account_id, error = %e, "could not discard unreadable ticket");
                }
                Err(AuthError::TicketCorrupted {
                    account_id: account_id.to_string(),
                    reason: parse_err.to_string(),
                })
            }
        }
    }

    /// Removing a ticket that is not there succeeds.
    pub async fn delete_ticket(&self, account_id: &AccountId) -> Result<()> {
        self.vault
            .delete_secret(&key_for(account_id))
            .await
            .map_err(|e| unavailable(account_id, "delete", e))
    }

    pub async fn has_ticket(&self, account_id: &AccountId) -> Result<bool> {
        self.vault
            .has_secret(&key_for(account_id))
            .await
            .map_err(|e| unavailable(account_id, "look up", e))
    }
}
