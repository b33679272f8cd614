//! Credential contracts consumed by the synchronizer and supplied by the host.

use crate::error::Result;
use crate::types::{AccountId, Credentials};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Supplies the auth token sent with every UDJ request.
///
/// `get_token` may suspend for as long as the user needs to sign in. It must
/// return [`AuthError::Cancelled`](crate::AuthError::Cancelled) once `cancel`
/// fires instead of waiting further.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a ticket hash for `account_id`, prompting the user if needed.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`](crate::AuthError): cancellation, timeout, rejected
    /// credentials, network or storage failures.
    async fn get_token(&self, account_id: &AccountId, cancel: &CancellationToken)
        -> Result<String>;

    /// Forgets the cached token after the server rejected it.
    async fn invalidate(&self, account_id: &AccountId) -> Result<()> {
        let _ = account_id;
        Ok(())
    }
}

/// Host hook that asks the user for a username and password.
///
/// Implementations typically show a login dialog and resolve when the user
/// submits or dismisses it. Returning `Ok(None)` means the user dismissed it.
#[async_trait]
pub trait InteractiveAuthenticator: Send + Sync {
    async fn request_credentials(&self, account_id: &AccountId) -> Result<Option<Credentials>>;
}
