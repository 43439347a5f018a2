//! Environment variable backend (read-only)
//!
//! `openai_api_key` is looked up as `CMDRX_OPENAI_API_KEY`.

use super::{Backend, CredentialName, CredentialStore, Secret, StoreError};
use std::collections::HashMap;

/// Prefix applied to every credential name
pub const ENV_PREFIX: &str = "CMDRX_";

enum Source {
    Process,
    Fixed(HashMap<String, String>),
}

pub struct EnvStore {
    source: Source,
}

impl Default for EnvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvStore {
    /// Read from the process environment
    pub fn new() -> Self {
        Self {
            source: Source::Process,
        }
    }

    /// Read from a fixed snapshot instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            source: Source::Fixed(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Environment variable name for a credential
    pub fn var_name(name: &CredentialName) -> String {
        format!("{}{}", ENV_PREFIX, name.as_str().to_uppercase())
    }

    fn lookup(&self, var: &str) -> Option<String> {
        match &self.source {
            Source::Process => std::env::var(var).ok(),
            Source::Fixed(vars) => vars.get(var).cloned(),
        }
    }
}

impl CredentialStore for EnvStore {
    fn backend(&self) -> Backend {
        Backend::Environment
    }

    fn get(&self, name: &CredentialName) -> Result<Secret, StoreError> {
        // An exported-but-empty variable counts as absent
        self.lookup(&Self::var_name(name))
            .filter(|v| !v.is_empty())
            .map(Secret::new)
            .ok_or_else(|| StoreError::NotFound(name.clone()))
    }

    fn set(&self, _name: &CredentialName, _value: &Secret) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }

    fn delete(&self, _name: &CredentialName) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }
}
