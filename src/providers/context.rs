//! Process-wide facts shared by every provider during a run.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::environment::Environment;
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;
use crate::resources::keyring::KeyFetcher;

/// System directories touched by the providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    /// Apt source list directory.
    pub sources_dir: PathBuf,
    /// Directory receiving dearmored signing keys.
    pub keyring_dir: PathBuf,
    /// Scratch space for key downloads, remote clones and the run log.
    pub cache_dir: PathBuf,
}

impl SystemPaths {
    /// The standard Debian locations, with the cache under `home`.
    #[must_use]
    pub fn for_home(home: &Path) -> Self {
        Self {
            sources_dir: PathBuf::from("/etc/apt/sources.list.d"),
            keyring_dir: PathBuf::from("/usr/share/keyrings"),
            cache_dir: home.join(".cache").join("envira"),
        }
    }

    /// Every directory below `root`, for tests and sandboxed runs.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self {
            sources_dir: root.join("sources.list.d"),
            keyring_dir: root.join("keyrings"),
            cache_dir: root.join("cache"),
        }
    }
}

/// Shared context for provider execution.
///
/// Built once per run and never mutated.
pub struct Context {
    /// Where the configuration lives.
    pub environment: Arc<Environment>,
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// System directories.
    pub paths: Arc<SystemPaths>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Signing key downloader.
    pub keys: Arc<dyn KeyFetcher>,
    /// Logger for output and step recording.
    pub log: Arc<dyn Log>,
    /// Replace conflicting state instead of failing.
    pub force: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("environment", &self.environment)
            .field("platform", &self.platform)
            .field("paths", &self.paths)
            .field("executor", &"<dyn Executor>")
            .field("keys", &"<dyn KeyFetcher>")
            .field("log", &"<dyn Log>")
            .field("force", &self.force)
            .finish()
    }
}
