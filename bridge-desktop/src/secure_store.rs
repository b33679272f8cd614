//! `SecureStore` backed by the OS credential vault via `keyring`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::{debug, warn};

/// Keychain on macOS, Credential Manager on Windows, Secret Service on Linux.
///
/// Keyring entries are strings, so values are stored base64 encoded. Each
/// secret key (for example `udj_ticket:alice`) becomes the entry's user
/// name under a shared service name.
#[derive(Debug, Clone)]
pub struct KeyringSecureStore {
    service: String,
}

impl KeyringSecureStore {
    pub const DEFAULT_SERVICE: &'static str = "udj-sync-core";

    pub fn new() -> Self {
        Self::with_service_name(Self::DEFAULT_SERVICE)
    }

    pub fn with_service_name(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).map_err(vault_error)
    }

    /// Reads the raw entry; `None` when the vault has nothing under `key`.
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(encoded) => Ok(Some(encoded)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(vault_error(e)),
        }
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn vault_error(err: keyring::Error) -> BridgeError {
    match err {
        keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
            BridgeError::NotAvailable(format!("credential vault: {err}"))
        }
        other => BridgeError::OperationFailed(format!("credential vault: {other}")),
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entry(key)?
            .set_password(&STANDARD.encode(value))
            .map_err(vault_error)?;
        debug!(key, "secret written");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(encoded) = self.read(key)? else {
            return Ok(None);
        };
        STANDARD.decode(encoded).map(Some).map_err(|e| {
            warn!(key, error = %e, "stored secret is not valid base64");
            BridgeError::OperationFailed(format!("corrupt secret under {key}: {e}"))
        })
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(vault_error(e)),
        }
    }

    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.read(key)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(KeyringSecureStore::new().service, "udj-sync-core");
        assert_eq!(KeyringSecureStore::with_service_name("udj-test").service, "udj-test");
    }

    #[tokio::test]
    async fn test_ticket_survives_roundtrip_when_vault_available() {
        let store = KeyringSecureStore::with_service_name("udj-sync-core-test");
        let key = "udj_ticket:roundtrip";
        let _ = store.delete_secret(key).await;

        // Headless CI rarely has a secret service running.
        if let Err(e) = store.set_secret(key, b"4b1d\x00ticket").await {
            println!("credential vault unavailable ({e}), skipping");
            return;
        }
        if let Ok(Some(value)) = store.get_secret(key).await {
            assert_eq!(value, b"4b1d\x00ticket".to_vec());
        }
        store.delete_secret(key).await.unwrap();
        store.delete_secret(key).await.unwrap();
    }
}
