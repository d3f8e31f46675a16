//! File copy and symlink resources.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{ensure_parent_dir, is_real_dir, remove_existing, same_file};
use super::{Resource, ResourceChange, ResourceState};

/// Resolve a destination: relative paths are taken from the current
/// directory, and an existing directory receives the source's file name.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn resolve_dest(dest: &str, source: &Path) -> Result<PathBuf> {
    let dest = std::path::absolute(dest).with_context(|| format!("resolve {dest}"))?;
    if dest.is_dir()
        && let Some(name) = source.file_name()
    {
        return Ok(dest.join(name));
    }
    Ok(dest)
}

/// A file copied byte-for-byte from the environment folder.
#[derive(Debug, Clone)]
pub struct CopyResource {
    /// File inside the environment folder.
    pub source: PathBuf,
    /// Where the copy lives.
    pub dest: PathBuf,
}

impl CopyResource {
    /// Copy `source` to `dest`.
    #[must_use]
    pub const fn new(source: PathBuf, dest: PathBuf) -> Self {
        Self { source, dest }
    }
}

impl Resource for CopyResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.source.display(), self.dest.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.dest.symlink_metadata().is_err() {
            return Ok(ResourceState::Missing);
        }
        if is_real_dir(&self.dest) {
            return Ok(ResourceState::Invalid {
                reason: "destination is a directory".to_string(),
            });
        }
        if same_file(&self.source, &self.dest) {
            return Ok(ResourceState::Correct);
        }
        Ok(ResourceState::Incorrect {
            current: "destination exists".to_string(),
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.dest)?;
        // Never write through a symlink into its target.
        if self.dest.is_symlink() {
            remove_existing(&self.dest)?;
        }
        std::fs::copy(&self.source, &self.dest).with_context(|| {
            format!("copy {} to {}", self.source.display(), self.dest.display())
        })?;
        Ok(ResourceChange::Applied)
    }
}

/// A symlink pointing back into the environment folder.
#[derive(Debug, Clone)]
pub struct LinkResource {
    /// What the link points to.
    pub source: PathBuf,
    /// Where the link lives.
    pub dest: PathBuf,
}

impl LinkResource {
    /// Link `dest` to `source`.
    #[must_use]
    pub const fn new(source: PathBuf, dest: PathBuf) -> Self {
        Self { source, dest }
    }
}

impl Resource for LinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.dest.display(), self.source.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if is_real_dir(&self.dest) {
            return Ok(ResourceState::Invalid {
                reason: "destination is a real directory".to_string(),
            });
        }

        match std::fs::read_link(&self.dest) {
            Ok(_) if same_file(&self.dest, &self.source) => Ok(ResourceState::Correct),
            Ok(existing) => Ok(ResourceState::Incorrect {
                current: format!("points to {}", existing.display()),
            }),
            Err(_) if self.dest.exists() => Ok(ResourceState::Incorrect {
                current: "regular file".to_string(),
            }),
            Err(_) => Ok(ResourceState::Missing),
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.dest)?;
        remove_existing(&self.dest)?;
        std::os::unix::fs::symlink(&self.source, &self.dest).with_context(|| {
            format!(
                "create link {} -> {}",
                self.dest.display(),
                self.source.display()
            )
        })?;
        Ok(ResourceChange::Applied)
    }
}
