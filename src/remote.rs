//! Acquisition of a configuration source given on the command line.
use std::path::{Path, PathBuf};

use crate::error::EnvironmentError;

/// Subdirectory of the cache directory that holds the cloned remote source.
const REMOTE_DIR: &str = "remote";

/// `true` when `s` parses as a URL with both a scheme and a host.
#[must_use]
pub fn is_url(s: &str) -> bool {
    s.parse::<ureq::http::Uri>()
        .is_ok_and(|uri| uri.scheme().is_some() && uri.host().is_some_and(|h| !h.is_empty()))
}

/// Clone `url` into `<cache_dir>/remote`, replacing any previous clone.
///
/// # Errors
///
/// Returns [`EnvironmentError::Clone`] if the cache directory cannot be
/// prepared or git reports an error.
pub fn clone_repository(url: &str, cache_dir: &Path) -> Result<PathBuf, EnvironmentError> {
    let clone_err = |message: String| EnvironmentError::Clone {
        url: url.to_string(),
        message,
    };

    let dest = cache_dir.join(REMOTE_DIR);
    if dest.exists() {
        std::fs::remove_dir_all(&dest)
            .map_err(|e| clone_err(format!("removing previous clone: {e}")))?;
    }
    std::fs::create_dir_all(cache_dir)
        .map_err(|e| clone_err(format!("creating {}: {e}", cache_dir.display())))?;

    tracing::debug!("cloning {url} into {}", dest.display());
    git2::Repository::clone(url, &dest).map_err(|e| clone_err(e.message().to_string()))?;
    Ok(dest)
}

/// Turn the `path_or_url` argument into a local path.
///
/// URLs are cloned into the cache directory; anything else must be an
/// existing path, taken relative to the current directory.
///
/// # Errors
///
/// Returns an error if cloning fails or the path does not exist.
pub fn resolve_source(path_or_url: &str, cache_dir: &Path) -> Result<PathBuf, EnvironmentError> {
    if is_url(path_or_url) {
        return clone_repository(path_or_url, cache_dir);
    }

    let path = PathBuf::from(path_or_url);
    if path.exists() {
        return std::path::absolute(&path)
            .map_err(|source| EnvironmentError::Resolve { path, source });
    }
    Err(EnvironmentError::InvalidSource(path_or_url.to_string()))
}
