//! Repository signing key download and keyring conversion.
use anyhow::{Context as _, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::exec::{Executor, command_line};
use crate::operations::OperationResult;

/// Downloads signing keys.
pub trait KeyFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch the body at `url`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or an error status.
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// [`KeyFetcher`] backed by `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpKeyFetcher;

impl KeyFetcher for HttpKeyFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        let resp = match agent.get(url).call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => anyhow::bail!("HTTP {code} for {url}"),
            Err(e) => return Err(e).with_context(|| format!("GET {url}")),
        };

        let mut body = Vec::new();
        resp.into_body()
            .into_reader()
            .read_to_end(&mut body)
            .with_context(|| format!("reading body of {url}"))?;
        Ok(body)
    }
}

/// Where a key is downloaded to and where its keyring ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLocation {
    /// Temporary download in the cache directory.
    pub temp_key: PathBuf,
    /// Dearmored keyring, named after the key URL's host.
    pub keyring: PathBuf,
}

impl KeyLocation {
    /// Derive the locations for `key_url`.
    ///
    /// Returns `None` when the URL has no host.
    #[must_use]
    pub fn for_url(key_url: &str, keyring_dir: &Path, cache_dir: &Path) -> Option<Self> {
        let uri = key_url.parse::<ureq::http::Uri>().ok()?;
        let host = uri.host()?;
        let name = uri
            .path()
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or("key");
        Some(Self {
            temp_key: cache_dir.join(format!("{name}.temp.key")),
            keyring: keyring_dir.join(format!("envira-{host}-keyring.gpg")),
        })
    }
}

/// Download `key_url` and dearmor it into the keyring directory.
///
/// Any existing keyring for the same host is replaced.  On success the
/// result's `data` holds the keyring path.
pub fn install_key(
    fetcher: &dyn KeyFetcher,
    executor: &dyn Executor,
    key_url: &str,
    location: &KeyLocation,
    timeout: Duration,
) -> OperationResult {
    let fetch_command = format!("GET {key_url}");

    if let Err(e) = remove_if_present(&location.keyring) {
        return OperationResult::failed(format!("{e:#}"));
    }

    tracing::debug!("downloading key {key_url} (timeout {}s)", timeout.as_secs());
    let body = match fetcher.fetch(key_url, timeout) {
        Ok(body) => body,
        Err(e) => return OperationResult::failed(format!("{e:#}")).with_command(fetch_command),
    };

    if let Err(e) = write_temp_key(&location.temp_key, &body) {
        return OperationResult::failed(format!("{e:#}"));
    }

    let keyring = location.keyring.display().to_string();
    let temp = location.temp_key.display().to_string();
    let args = ["--batch", "--yes", "--dearmor", "-o", keyring.as_str(), temp.as_str()];
    let line = command_line("gpg", &args);
    let result = match executor.run_unchecked("gpg", &args) {
        Ok(res) => OperationResult::from_exec(line, &res),
        Err(e) => OperationResult::spawn_failed(line, &e),
    };

    if let Err(e) = remove_if_present(&location.temp_key) {
        tracing::warn!("{e:#}");
    }

    if result.is_ok() {
        result.with_data(keyring)
    } else {
        result
    }
}

fn write_temp_key(path: &Path, body: &[u8]) -> Result<()> {
    super::helpers::fs::ensure_parent_dir(path)?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("remove {}", path.display()))
        }
        _ => Ok(()),
    }
}

/// Shared key fetcher double for unit tests.
#[cfg(test)]
pub mod test_helpers {
    use super::KeyFetcher;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves a fixed body, or fails, and records the requested URLs.
    #[derive(Debug, Default)]
    pub struct MockKeyFetcher {
        body: Option<Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockKeyFetcher {
        /// A fetcher returning `body` for every URL.
        #[must_use]
        pub fn serving(body: &[u8]) -> Self {
            Self {
                body: Some(body.to_vec()),
                requests: Mutex::default(),
            }
        }

        /// A fetcher failing every request.
        #[must_use]
        pub fn unreachable() -> Self {
            Self::default()
        }

        /// URLs requested so far.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().map_or_else(|_| vec![], |g| g.clone())
        }
    }

    impl KeyFetcher for MockKeyFetcher {
        fn fetch(&self, url: &str, _timeout: Duration) -> anyhow::Result<Vec<u8>> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(url.to_string());
            }
            self.body
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }
}
