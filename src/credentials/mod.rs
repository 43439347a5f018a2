//! Credential storage and resolution
//!
//! API keys can live in three places, tried in this order:
//!
//! 1. The platform secret store (Keychain, Credential Manager, Secret Service)
//! 2. Environment variables (`CMDRX_<NAME>`, read-only)
//! 3. A JSON document at `<config_dir>/cmdrx/credentials.json` (mode 0600)
//!
//! Every backend implements [`CredentialStore`]; the [`CredentialResolver`]
//! walks them in order and returns the first value found.

mod env_store;
mod file_store;
mod keyring_store;
mod resolver;

pub use env_store::{EnvStore, ENV_PREFIX};
pub use file_store::FileStore;
pub use keyring_store::{KeyringStore, SERVICE_NAME};
pub use resolver::{CredentialResolver, ResolutionFailed};

use std::fmt;
use thiserror::Error;

/// Logical name of a credential, e.g. `openai_api_key`.
///
/// The same name addresses the secret in every backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialName(String);

impl CredentialName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CredentialName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A secret string. `Debug` is redacted and there is no `Display`,
/// so the value only leaves through [`Secret::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Which backend produced a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    SecretStore,
    Environment,
    File,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::SecretStore => write!(f, "secret store"),
            Backend::Environment => write!(f, "environment"),
            Backend::File => write!(f, "credentials file"),
        }
    }
}

/// A resolved credential, tagged with the backend it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub name: CredentialName,
    pub value: Secret,
    pub source: Backend,
}

/// Failure modes shared by all backends.
///
/// Messages carry the credential name and backend detail, never the value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("credential '{0}' not found")]
    NotFound(CredentialName),

    #[error("write denied: {0}")]
    Denied(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("operation not supported by this backend")]
    Unsupported,
}

/// Uniform get/set/delete contract over one storage backend
pub trait CredentialStore {
    /// Backend tag attached to records this store produces
    fn backend(&self) -> Backend;

    fn get(&self, name: &CredentialName) -> Result<Secret, StoreError>;

    fn set(&self, name: &CredentialName, value: &Secret) -> Result<(), StoreError>;

    fn delete(&self, name: &CredentialName) -> Result<(), StoreError>;
}

/// The credential names of the shipped providers, for listing and doctor output.
pub const KNOWN_CREDENTIALS: &[&str] = &[
    "openai_api_key",
    "anthropic_api_key",
    "grok_api_key",
    "custom_api_key",
    "custom_bearer_token",
];

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store for resolver and orchestrator tests

    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    pub struct MemoryStore {
        backend: Backend,
        values: RefCell<HashMap<String, String>>,
        unavailable: bool,
        read_only: bool,
        pub gets: Cell<usize>,
    }

    impl MemoryStore {
        pub fn new(backend: Backend) -> Self {
            Self {
                backend,
                values: RefCell::new(HashMap::new()),
                unavailable: false,
                read_only: false,
                gets: Cell::new(0),
            }
        }

        pub fn with(self, name: &str, value: &str) -> Self {
            self.values
                .borrow_mut()
                .insert(name.to_string(), value.to_string());
            self
        }

        pub fn unavailable(mut self) -> Self {
            self.unavailable = true;
            self
        }

        pub fn read_only(mut self) -> Self {
            self.read_only = true;
            self
        }

        pub fn contains(&self, name: &str) -> bool {
            self.values.borrow().contains_key(name)
        }
    }

    impl<T: CredentialStore + ?Sized> CredentialStore for std::rc::Rc<T> {
        fn backend(&self) -> Backend {
            (**self).backend()
        }

        fn get(&self, name: &CredentialName) -> Result<Secret, StoreError> {
            (**self).get(name)
        }

        fn set(&self, name: &CredentialName, value: &Secret) -> Result<(), StoreError> {
            (**self).set(name, value)
        }

        fn delete(&self, name: &CredentialName) -> Result<(), StoreError> {
            (**self).delete(name)
        }
    }

    impl CredentialStore for MemoryStore {
        fn backend(&self) -> Backend {
            self.backend
        }

        fn get(&self, name: &CredentialName) -> Result<Secret, StoreError> {
            self.gets.set(self.gets.get() + 1);
            if self.unavailable {
                return Err(StoreError::BackendUnavailable("locked".into()));
            }
            self.values
                .borrow()
                .get(name.as_str())
                .map(|v| Secret::new(v.clone()))
                .ok_or_else(|| StoreError::NotFound(name.clone()))
        }

        fn set(&self, name: &CredentialName, value: &Secret) -> Result<(), StoreError> {
            if self.read_only {
                return Err(StoreError::Unsupported);
            }
            if self.unavailable {
                return Err(StoreError::BackendUnavailable("locked".into()));
            }
            self.values
                .borrow_mut()
                .insert(name.as_str().to_string(), value.expose().to_string());
            Ok(())
        }

        fn delete(&self, name: &CredentialName) -> Result<(), StoreError> {
            if self.read_only {
                return Err(StoreError::Unsupported);
            }
            if self.unavailable {
                return Err(StoreError::BackendUnavailable("locked".into()));
            }
            self.values
                .borrow_mut()
                .remove(name.as_str())
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(name.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("sk-very-secret");
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("sk-very-secret"));
        assert_eq!(rendered, "Secret(***)");
    }

    #[test]
    fn test_record_debug_hides_value() {
        let record = CredentialRecord {
            name: "openai_api_key".into(),
            value: Secret::new("sk-test"),
            source: Backend::File,
        };
        assert!(!format!("{:?}", record).contains("sk-test"));
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::SecretStore.to_string(), "secret store");
        assert_eq!(Backend::File.to_string(), "credentials file");
    }
}
