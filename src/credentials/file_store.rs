//! Permissioned JSON credentials file
//!
//! One flat JSON object, credential name to secret string:
//!
//! ```json
//! { "openai_api_key": "sk-..." }
//! ```
//!
//! Every write rewrites the whole document and leaves the file at mode 0600.

use super::{Backend, CredentialName, CredentialStore, Secret, StoreError};
use serde_json::{Map, Value};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CREDENTIALS_FILE: &str = "credentials.json";

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/cmdrx/credentials.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cmdrx").join(CREDENTIALS_FILE))
    }

    /// Store at the default per-user location, or `None` when no home/config dir exists
    pub fn at_default_location() -> Option<Self> {
        Self::default_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Group or other permission bits are set on the file
    pub fn is_exposed(&self) -> bool {
        has_loose_permissions(&self.path)
    }

    /// Load the document. `Ok(None)` when the file does not exist.
    fn load(&self) -> Result<Option<Map<String, Value>>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::BackendUnavailable(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if has_loose_permissions(&self.path) {
            warn!(
                "Credentials file {} is readable by group or others; it will be tightened on next write",
                self.path.display()
            );
        }

        // serde_json errors report position only, never file content
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(StoreError::BackendUnavailable(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StoreError::BackendUnavailable(format!(
                "{} is malformed: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&self, doc: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Denied(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::Denied(format!("cannot serialize credentials: {}", e)))?;

        let mut file = open_for_write(&self.path)
            .map_err(|e| StoreError::Denied(format!("cannot open {}: {}", self.path.display(), e)))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| StoreError::Denied(format!("cannot write {}: {}", self.path.display(), e)))?;

        debug!("Wrote credentials file {}", self.path.display());
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn backend(&self) -> Backend {
        Backend::File
    }

    fn get(&self, name: &CredentialName) -> Result<Secret, StoreError> {
        let Some(doc) = self.load()? else {
            return Err(StoreError::NotFound(name.clone()));
        };

        match doc.get(name.as_str()) {
            None => Err(StoreError::NotFound(name.clone())),
            Some(Value::String(s)) if s.is_empty() => Err(StoreError::NotFound(name.clone())),
            Some(Value::String(s)) => Ok(Secret::new(s.clone())),
            Some(_) => Err(StoreError::BackendUnavailable(format!(
                "value for '{}' in {} is not a string",
                name,
                self.path.display()
            ))),
        }
    }

    fn set(&self, name: &CredentialName, value: &Secret) -> Result<(), StoreError> {
        // A malformed document is left alone rather than overwritten
        let mut doc = self.load()?.unwrap_or_default();
        doc.insert(
            name.as_str().to_string(),
            Value::String(value.expose().to_string()),
        );
        self.save(&doc)
    }

    fn delete(&self, name: &CredentialName) -> Result<(), StoreError> {
        let Some(mut doc) = self.load()? else {
            return Err(StoreError::NotFound(name.clone()));
        };
        if doc.remove(name.as_str()).is_none() {
            return Err(StoreError::NotFound(name.clone()));
        }
        self.save(&doc)
    }
}

/// Open for a full rewrite with owner-only permissions in place before any
/// byte is written. The mode on open only applies to new files, so an
/// existing file is tightened first.
fn open_for_write(path: &Path) -> std::io::Result<fs::File> {
    if path.exists() {
        restrict_to_owner(path)?;
    }
    open_owner_only(path)
}

#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o600);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn has_loose_permissions(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o077 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn has_loose_permissions(_path: &Path) -> bool {
    false
}
