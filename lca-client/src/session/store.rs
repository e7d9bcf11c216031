//! Credential storage backends
//!
//! Exactly one credential is stored at a time. The file store is the
//! client-wide slot shared by every `lca` process of the same user.

use super::Credential;
use crate::error::{ClientError, ClientResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage slot for the single credential
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> ClientResult<Option<Credential>>;
    fn save(&self, credential: &Credential) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// Credential persisted as the sole content of one file
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> ClientResult<Option<Credential>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential::new(token)))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::Credential(format!(
                "read {} failed: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&self, credential: &Credential) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ClientError::Credential(format!("create {} failed: {}", parent.display(), e))
                })?;
            }
        }
        let write_failed = |e: std::io::Error| {
            ClientError::Credential(format!("write {} failed: {}", self.path.display(), e))
        };

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Owner-only from the moment the file exists
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(write_failed)?;

        // `mode` only applies on creation; narrow a pre-existing file before writing
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    ClientError::Credential(format!(
                        "chmod {} failed: {}",
                        self.path.display(),
                        e
                    ))
                })?;
        }

        file.write_all(credential.as_str().as_bytes())
            .map_err(write_failed)?;

        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Credential(format!(
                "remove {} failed: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// In-process credential slot
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> ClientResult<Option<Credential>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, credential: &Credential) -> ClientResult<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
