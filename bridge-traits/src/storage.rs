//! Secret storage bridge.
//!
//! The core persists one thing secretly: the UDJ ticket of each signed-in
//! account. Hosts back this with whatever the platform offers (Android
//! Keystore, macOS Keychain, Secret Service), so the trait is a plain
//! key to bytes map.

use async_trait::async_trait;

use crate::error::Result;

/// Opaque, encrypted-at-rest byte storage keyed by string.
///
/// Values may be credentials; implementations must not log them.
///
/// ```ignore
/// vault.set_secret("udj_ticket:alice", record).await?;
/// assert!(vault.has_secret("udj_ticket:alice").await?);
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Insert or replace.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// `Ok(None)` for an unknown key; `Err` only when the vault itself
    /// cannot be reached.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Removing an unknown key succeeds.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    async fn has_secret(&self, key: &str) -> Result<bool> {
        self.get_secret(key).await.map(|value| value.is_some())
    }
}
