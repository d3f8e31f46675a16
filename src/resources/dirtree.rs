//! Directory tree creation.
use anyhow::{Context as _, Result};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::{Gid, Uid, chown};

use super::{Resource, ResourceChange, ResourceState, converge_change};
use crate::config::env::DirNode;
use crate::operations::OperationResult;

/// A single directory with a permission mode and optional owner.
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    /// Directory to create.
    pub path: PathBuf,
    /// Octal permission bits.
    pub mode: u32,
    /// `(uid, gid)` to hand the new directory to.
    pub owner: Option<(u32, u32)>,
}

impl Resource for DirectoryResource {
    fn description(&self) -> String {
        format!("directory {} ({:o})", self.path.display(), self.mode)
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.path.is_dir() {
            return Ok(ResourceState::Correct);
        }
        if self.path.symlink_metadata().is_ok() {
            return Ok(ResourceState::Invalid {
                reason: "exists and is not a directory".to_string(),
            });
        }
        Ok(ResourceState::Missing)
    }

    fn apply(&self) -> Result<ResourceChange> {
        std::fs::create_dir(&self.path)
            .with_context(|| format!("create directory {}", self.path.display()))?;
        std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(self.mode))
            .with_context(|| format!("set mode {:o} on {}", self.mode, self.path.display()))?;
        if let Some((uid, gid)) = self.owner {
            chown(
                &self.path,
                Some(Uid::from_raw(uid)),
                Some(Gid::from_raw(gid)),
            )
            .with_context(|| format!("chown {}", self.path.display()))?;
        }
        Ok(ResourceChange::Applied)
    }
}

/// Create `nodes` under `root`, parents before children.
///
/// Existing directories keep their mode and owner.  The first failure stops
/// the walk.  On success the result's `data` holds the number of
/// directories created.
pub fn build_tree(root: &Path, nodes: &[DirNode], owner: Option<(u32, u32)>) -> OperationResult {
    if !root.is_dir() {
        return OperationResult::failed(format!(
            "dirtree root {} is not a directory",
            root.display()
        ));
    }

    let mut created = 0usize;
    match walk(root, nodes, owner, &mut created) {
        Ok(()) => OperationResult::ok().with_data(created.to_string()),
        Err(result) => result,
    }
}

fn walk(
    parent: &Path,
    nodes: &[DirNode],
    owner: Option<(u32, u32)>,
    created: &mut usize,
) -> Result<(), OperationResult> {
    for node in nodes {
        let mode = u32::from_str_radix(&node.mode, 8).map_err(|e| {
            OperationResult::failed(format!("invalid mode '{}': {e}", node.mode))
        })?;
        let dir = DirectoryResource {
            path: parent.join(&node.name),
            mode,
            owner,
        };

        if converge_change(&dir, false)? == ResourceChange::Applied {
            tracing::debug!("created {}", dir.description());
            *created += 1;
        }

        walk(&dir.path, &node.children, owner, created)?;
    }
    Ok(())
}
