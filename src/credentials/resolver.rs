//! Ordered credential resolution across backends

use super::{
    Backend, CredentialName, CredentialRecord, CredentialStore, EnvStore, FileStore, KeyringStore,
    Secret, StoreError,
};
use thiserror::Error;
use tracing::{debug, warn};

/// No backend held a value for the credential
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("credential '{name}' not found in any backend")]
pub struct ResolutionFailed {
    pub name: CredentialName,
}

/// Walks credential backends in a fixed priority order.
///
/// The first backend returning a value wins. `NotFound`, `BackendUnavailable`
/// and `Unsupported` all fall through to the next backend; values are
/// returned exactly as stored, never merged or validated.
pub struct CredentialResolver {
    stores: Vec<Box<dyn CredentialStore>>,
}

impl CredentialResolver {
    /// Backends are queried in the order given
    pub fn new(stores: Vec<Box<dyn CredentialStore>>) -> Self {
        Self { stores }
    }

    /// Secret store, then environment, then the per-user credentials file
    pub fn with_default_stores() -> Self {
        let mut stores: Vec<Box<dyn CredentialStore>> =
            vec![Box::new(KeyringStore::new()), Box::new(EnvStore::new())];
        match FileStore::at_default_location() {
            Some(file) => stores.push(Box::new(file)),
            None => warn!("No config directory found; credentials file backend disabled"),
        }
        Self::new(stores)
    }

    /// Resolve one credential name to its first available value
    pub fn resolve(&self, name: &CredentialName) -> Result<CredentialRecord, ResolutionFailed> {
        for store in &self.stores {
            let backend = store.backend();
            match store.get(name) {
                Ok(value) => {
                    debug!("Resolved '{}' from {}", name, backend);
                    return Ok(CredentialRecord {
                        name: name.clone(),
                        value,
                        source: backend,
                    });
                }
                Err(StoreError::NotFound(_)) => {
                    debug!("'{}' not in {}", name, backend);
                }
                Err(e) => {
                    debug!("Skipping {} for '{}': {}", backend, name, e);
                }
            }
        }

        Err(ResolutionFailed { name: name.clone() })
    }

    /// Store a credential in the first writable backend.
    ///
    /// Backends that are unavailable or read-only are skipped, so a missing
    /// secret service falls back to the credentials file.
    pub fn store(&self, name: &CredentialName, value: &Secret) -> Result<Backend, StoreError> {
        let mut last_error = StoreError::Unsupported;
        for store in &self.stores {
            let backend = store.backend();
            match store.set(name, value) {
                Ok(()) => {
                    debug!("Stored '{}' in {}", name, backend);
                    return Ok(backend);
                }
                Err(StoreError::Unsupported) => {}
                Err(e) => {
                    warn!("Could not store '{}' in {}: {}", name, backend, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    /// Delete a credential from every writable backend.
    ///
    /// Returns the backends that held it. When none did, the last backend
    /// failure is returned if there was one, otherwise `NotFound`.
    pub fn remove(&self, name: &CredentialName) -> Result<Vec<Backend>, StoreError> {
        let mut removed = Vec::new();
        let mut failure = None;
        for store in &self.stores {
            let backend = store.backend();
            match store.delete(name) {
                Ok(()) => removed.push(backend),
                Err(StoreError::NotFound(_)) | Err(StoreError::Unsupported) => {}
                Err(e) => {
                    warn!("Could not delete '{}' from {}: {}", name, backend, e);
                    failure = Some(e);
                }
            }
        }

        match (removed.is_empty(), failure) {
            (false, _) => Ok(removed),
            (true, Some(e)) => Err(e),
            (true, None) => Err(StoreError::NotFound(name.clone())),
        }
    }
}
