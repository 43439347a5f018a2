//! Platform secret store backend
//!
//! Entries are stored under service `cmdrx` with the credential name as the
//! account. Anything other than "no such entry" (no daemon, locked keychain,
//! access denied) surfaces as `BackendUnavailable` so the resolver can move on.

use super::{Backend, CredentialName, CredentialStore, Secret, StoreError};
use keyring::Entry;
use tracing::debug;

/// Service name used for keyring entries
pub const SERVICE_NAME: &str = "cmdrx";

#[derive(Debug)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, name: &CredentialName) -> Result<Entry, StoreError> {
        Entry::new(&self.service, name.as_str()).map_err(|e| unavailable(&e))
    }
}

impl CredentialStore for KeyringStore {
    fn backend(&self) -> Backend {
        Backend::SecretStore
    }

    fn get(&self, name: &CredentialName) -> Result<Secret, StoreError> {
        match self.entry(name)?.get_password() {
            Ok(value) if value.is_empty() => Err(StoreError::NotFound(name.clone())),
            Ok(value) => Ok(Secret::new(value)),
            Err(keyring::Error::NoEntry) => Err(StoreError::NotFound(name.clone())),
            Err(e) => Err(unavailable(&e)),
        }
    }

    fn set(&self, name: &CredentialName, value: &Secret) -> Result<(), StoreError> {
        self.entry(name)?
            .set_password(value.expose())
            .map_err(|e| unavailable(&e))?;
        debug!("Stored '{}' in secret store", name);
        Ok(())
    }

    fn delete(&self, name: &CredentialName) -> Result<(), StoreError> {
        match self.entry(name)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(StoreError::NotFound(name.clone())),
            Err(e) => Err(unavailable(&e)),
        }
    }
}

/// Map a keyring failure to `BackendUnavailable`.
///
/// `BadEncoding` carries the raw stored bytes, so it is described generically.
fn unavailable(error: &keyring::Error) -> StoreError {
    let detail = match error {
        keyring::Error::BadEncoding(_) => "stored value is not valid UTF-8".to_string(),
        keyring::Error::NoStorageAccess(e) => format!("no storage access: {}", e),
        keyring::Error::PlatformFailure(e) => format!("platform failure: {}", e),
        other => other.to_string(),
    };
    StoreError::BackendUnavailable(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_tag() {
        assert_eq!(KeyringStore::new().backend(), Backend::SecretStore);
    }

    #[test]
    fn test_bad_encoding_does_not_leak_bytes() {
        let err = unavailable(&keyring::Error::BadEncoding(b"sk-raw-secret".to_vec()));
        assert!(matches!(err, StoreError::BackendUnavailable(_)));
        assert!(!err.to_string().contains("sk-raw-secret"));
    }

    #[test]
    fn test_platform_failure_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "dbus down");
        let err = unavailable(&keyring::Error::PlatformFailure(Box::new(io)));
        assert_eq!(
            err,
            StoreError::BackendUnavailable("platform failure: dbus down".into())
        );
    }

    #[test]
    fn test_linux_backend_is_persistent() {
        let manifest = include_str!("../../Cargo.toml");
        let keyring = manifest
            .lines()
            .find(|l| l.starts_with("keyring"))
            .unwrap();
        assert!(keyring.contains("\"sync-secret-service\""));
        // keyutils entries are dropped on reboot
        assert!(!keyring.contains("\"linux-native\""));
    }
}
