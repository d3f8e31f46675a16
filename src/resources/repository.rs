//! Apt source list entry resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::{Resource, ResourceChange, ResourceState, helpers};

/// Render an apt source line.
///
/// ```
/// use envira::resources::repository::source_line;
///
/// assert_eq!(
///     source_line("deb", None, "http://example.test/repo", "jammy", "main"),
///     "deb http://example.test/repo jammy main"
/// );
/// ```
#[must_use]
pub fn source_line(
    kind: &str,
    keyring: Option<&Path>,
    url: &str,
    codename: &str,
    branch: &str,
) -> String {
    match keyring {
        Some(k) => format!("{kind} [signed-by={}] {url} {codename} {branch}", k.display()),
        None => format!("{kind} {url} {codename} {branch}"),
    }
}

/// One line in a file under `sources.list.d`.
///
/// Lines are matched on whitespace-separated tokens, so a line for
/// `http://x/repo` does not claim `http://x/repo2`.  Comment lines are
/// ignored.
#[derive(Debug, Clone)]
pub struct SourceListEntry {
    /// The list file.
    pub list_path: PathBuf,
    /// The full line to ensure.
    pub line: String,
    /// Repository URL identifying lines for this repository.
    pub url: String,
}

impl SourceListEntry {
    /// Ensure `line` in `list_path` for repository `url`.
    #[must_use]
    pub const fn new(list_path: PathBuf, line: String, url: String) -> Self {
        Self {
            list_path,
            line,
            url,
        }
    }

    fn mentions_url(&self, line: &str) -> bool {
        let line = line.trim();
        !line.starts_with('#') && line.split_whitespace().any(|tok| tok == self.url)
    }

    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.list_path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", self.list_path.display())),
        }
    }
}

impl Resource for SourceListEntry {
    fn description(&self) -> String {
        format!("{} in {}", self.url, self.list_path.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Some(content) = self.read()? else {
            return Ok(ResourceState::Missing);
        };

        if content.lines().any(|l| l.trim() == self.line) {
            return Ok(ResourceState::Correct);
        }

        Ok(content
            .lines()
            .find(|l| self.mentions_url(l))
            .map_or(ResourceState::Missing, |existing| ResourceState::Incorrect {
                current: existing.trim().to_string(),
            }))
    }

    /// Drop every line mentioning the URL, then append the desired line.
    fn apply(&self) -> Result<ResourceChange> {
        helpers::fs::ensure_parent_dir(&self.list_path)?;

        let mut lines: Vec<String> = self
            .read()?
            .unwrap_or_default()
            .lines()
            .filter(|l| !self.mentions_url(l))
            .map(str::to_string)
            .collect();
        lines.push(self.line.clone());

        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(&self.list_path, content)
            .with_context(|| format!("write {}", self.list_path.display()))?;
        Ok(ResourceChange::Applied)
    }

    fn conflict(&self, _current: &str) -> String {
        format!("Repo '{}' duplicated! Use -f/--force to fix.", self.url)
    }
}
