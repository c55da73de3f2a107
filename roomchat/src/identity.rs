//! Persisted current-user identity.
//!
//! The resolved identity of the signed-in user lives as JSON in a single
//! fixed-name file under the platform data directory. It is loaded once at
//! startup and handed to the session controller explicitly — nothing else
//! reads it ambiently. An auth failure clears the file wholesale.

use std::path::{Path, PathBuf};

use roomchat_proto::user::User;

/// Fixed file name of the persisted identity.
pub const IDENTITY_FILE: &str = "session.json";

/// Errors that can occur while reading or writing the identity file.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The platform data directory could not be determined.
    #[error("could not determine data directory (no HOME or XDG_DATA_HOME)")]
    NoDataDir,

    /// Reading or writing the identity file failed.
    #[error("identity file {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The identity could not be encoded or decoded as JSON.
    #[error("invalid identity data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Durable storage for the current user's identity.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    /// Open the store at the default location
    /// (`<data dir>/roomchat/session.json`).
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NoDataDir`] when the platform data
    /// directory cannot be determined.
    pub fn open() -> Result<Self, IdentityError> {
        let data_dir = dirs::data_local_dir().ok_or(IdentityError::NoDataDir)?;
        Ok(Self {
            path: data_dir.join("roomchat").join(IDENTITY_FILE),
        })
    }

    /// Open the store at an explicit path (used by tests).
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file the identity persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored identity, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] if the file exists but cannot be read or
    /// parsed. A missing file is `Ok(None)`, not an error.
    pub fn load(&self) -> Result<Option<User>, IdentityError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(IdentityError::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Persist the identity, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Io`] if the directory or file cannot be
    /// written.
    pub fn save(&self, user: &User) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IdentityError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let contents = serde_json::to_string_pretty(user)?;
        std::fs::write(&self.path, contents).map_err(|e| IdentityError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Remove the stored identity wholesale. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Io`] if the file exists but cannot be
    /// removed.
    pub fn clear(&self) -> Result<(), IdentityError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IdentityError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
