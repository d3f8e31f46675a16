//! The resolved configuration location and the path containment check.
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::EnvironmentError;

/// Default configuration file name.
pub const DEFAULT_CONFIG_NAME: &str = "envira.toml";

/// Where the configuration lives.
///
/// `folder_path` is stored in canonical (absolute, symlink-free) form so that
/// containment checks compare like with like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    folder_path: PathBuf,
    config_path: PathBuf,
}

/// A user-supplied path failed the containment check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainmentError {
    /// The path does not exist, so it cannot be resolved.
    #[error("file {} does not exist", .0.display())]
    Missing(PathBuf),

    /// The resolved path is not strictly inside the environment folder.
    #[error("attempt to access {} outside of environment folder {}", .path.display(), .folder.display())]
    Escapes {
        /// Resolved path.
        path: PathBuf,
        /// Environment folder.
        folder: PathBuf,
    },

    /// The resolved path is inside the folder but not directly in it.
    #[error("{} must be placed directly in environment folder {}", .path.display(), .folder.display())]
    NotDirectChild {
        /// Resolved path.
        path: PathBuf,
        /// Environment folder.
        folder: PathBuf,
    },

    /// Resolution failed for another I/O reason.
    #[error("cannot resolve {}: {message}", .path.display())]
    Resolve {
        /// Path being resolved.
        path: PathBuf,
        /// I/O error text.
        message: String,
    },
}

impl Environment {
    /// Resolve `path` (a directory containing `config_name`, or the config
    /// file itself) into an environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist, the directory does not
    /// hold the config file, or a file is named differently.
    pub fn resolve(path: &Path, config_name: &str) -> Result<Self, EnvironmentError> {
        if path.is_dir() {
            let config = path.join(config_name);
            if !config.is_file() {
                return Err(EnvironmentError::ConfigNotFound {
                    folder: path.to_path_buf(),
                    name: config_name.to_string(),
                });
            }
            let folder_path = canonical(path)?;
            let config_path = folder_path.join(config_name);
            return Ok(Self {
                folder_path,
                config_path,
            });
        }

        if path.is_file() {
            if path.file_name().and_then(|n| n.to_str()) != Some(config_name) {
                return Err(EnvironmentError::NameMismatch {
                    path: path.to_path_buf(),
                    name: config_name.to_string(),
                });
            }
            let config_path = canonical(path)?;
            let folder_path = config_path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| EnvironmentError::InvalidSource(path.display().to_string()))?;
            return Ok(Self {
                folder_path,
                config_path,
            });
        }

        Err(EnvironmentError::InvalidSource(path.display().to_string()))
    }

    /// Directory containing the configuration file.
    #[must_use]
    pub fn folder_path(&self) -> &Path {
        &self.folder_path
    }

    /// Absolute path of the configuration file.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolve `relative` against the environment folder and require the
    /// result to lie strictly inside it.
    ///
    /// The path is canonicalized first, so `..` components and symlinks that
    /// point elsewhere are both caught.  The folder itself is rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainmentError`] when the path is missing or escapes.
    pub fn contain(&self, relative: &Path) -> Result<PathBuf, ContainmentError> {
        let joined = self.folder_path.join(relative);
        let resolved = dunce::canonicalize(&joined).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContainmentError::Missing(joined.clone())
            } else {
                ContainmentError::Resolve {
                    path: joined.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        if resolved == self.folder_path || !resolved.starts_with(&self.folder_path) {
            return Err(ContainmentError::Escapes {
                path: resolved,
                folder: self.folder_path.clone(),
            });
        }
        Ok(resolved)
    }

    /// Like [`contain`](Self::contain), and additionally require the
    /// resolved path to sit directly in the environment folder.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainmentError`] when the path is missing, escapes, or
    /// is nested in a subdirectory.
    pub fn contain_direct_child(&self, relative: &Path) -> Result<PathBuf, ContainmentError> {
        let resolved = self.contain(relative)?;
        if resolved.parent() != Some(self.folder_path.as_path()) {
            return Err(ContainmentError::NotDirectChild {
                path: resolved,
                folder: self.folder_path.clone(),
            });
        }
        Ok(resolved)
    }
}

fn canonical(path: &Path) -> Result<PathBuf, EnvironmentError> {
    dunce::canonicalize(path).map_err(|source| EnvironmentError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}
