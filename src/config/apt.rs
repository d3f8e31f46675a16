//! Pattern for the `[apt]` section.
use serde::Deserialize;

use super::validation::{ConfigValidator, ValidationError, is_http_url};

/// Default key download timeout in seconds.
pub const DEFAULT_KEY_TIMEOUT_SECS: u64 = 10;

/// Default source list file name under `sources.list.d`.
pub const DEFAULT_SOURCE_LIST: &str = "envira.list";

/// Repository types understood by apt.
const REPO_TYPES: &[&str] = &["deb", "deb-src"];

/// Validated shape of the `[apt]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AptPattern {
    /// Run `apt-get update` after the repositories are in place.
    #[serde(default = "default_true")]
    pub update: bool,
    /// Run `apt-get upgrade -y`.
    #[serde(default)]
    pub upgrade: bool,
    /// Repositories to register, in order.
    #[serde(default)]
    pub repos: Vec<Repository>,
    /// Packages to install, in order.
    #[serde(default)]
    pub install: Vec<Package>,
    /// Key download timeout in seconds.
    #[serde(default = "default_key_timeout")]
    pub key_timeout: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_key_timeout() -> u64 {
    DEFAULT_KEY_TIMEOUT_SECS
}

/// An apt repository to register.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RepositoryEntry")]
pub struct Repository {
    /// Repository base URL.
    pub url: String,
    /// Signing key to download and dearmor.
    pub key_url: Option<String>,
    /// `deb` or `deb-src`.
    pub kind: String,
    /// Component written after the release codename (`main`, ...).
    pub branch: String,
    /// File name under `sources.list.d`.
    pub source_list: String,
}

/// A single entry in `repos`: either a bare URL or a full table.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepositoryEntry {
    /// Plain string: `"http://example.test/repo"`.
    Url(String),
    /// Structured: `{ repo_url = "...", key_url = "...", branch = "stable" }`.
    Detailed {
        #[serde(alias = "url")]
        repo_url: String,
        #[serde(default)]
        key_url: Option<String>,
        #[serde(rename = "type", default = "default_repo_type")]
        kind: String,
        #[serde(default = "default_branch")]
        branch: String,
        #[serde(default = "default_source_list")]
        source_list: String,
    },
}

fn default_repo_type() -> String {
    "deb".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_source_list() -> String {
    DEFAULT_SOURCE_LIST.to_string()
}

impl From<RepositoryEntry> for Repository {
    fn from(entry: RepositoryEntry) -> Self {
        match entry {
            RepositoryEntry::Url(url) => Self {
                url,
                key_url: None,
                kind: default_repo_type(),
                branch: default_branch(),
                source_list: default_source_list(),
            },
            RepositoryEntry::Detailed {
                repo_url,
                key_url,
                kind,
                branch,
                source_list,
            } => Self {
                url: repo_url,
                key_url,
                kind,
                branch,
                source_list,
            },
        }
    }
}

/// A package to install, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PackageEntry")]
pub struct Package {
    /// Package name.
    pub name: String,
    /// Exact version to pin, if any.
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PackageEntry {
    Name(String),
    Pinned {
        #[serde(alias = "name")]
        package: String,
        #[serde(default)]
        version: Option<String>,
    },
}

impl From<PackageEntry> for Package {
    fn from(entry: PackageEntry) -> Self {
        match entry {
            PackageEntry::Name(name) => Self {
                name,
                version: None,
            },
            PackageEntry::Pinned { package, version } => Self {
                name: package,
                version,
            },
        }
    }
}

impl Package {
    /// Argument passed to `apt-get install`: `name` or `name=version`.
    #[must_use]
    pub fn install_arg(&self) -> String {
        match &self.version {
            Some(v) => format!("{}={v}", self.name),
            None => self.name.clone(),
        }
    }
}

fn is_blank_or_spaced(s: &str) -> bool {
    s.trim().is_empty() || s.chars().any(char::is_whitespace)
}

impl ConfigValidator for AptPattern {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.key_timeout == 0 {
            errors.push(ValidationError::new(
                "key_timeout",
                "must be greater than zero",
            ));
        }

        for (i, repo) in self.repos.iter().enumerate() {
            let field = |name: &str| format!("repos[{i}].{name}");

            if is_blank_or_spaced(&repo.url) {
                errors.push(ValidationError::new(
                    field("repo_url"),
                    "must be a non-empty URL without spaces",
                ));
            }
            if let Some(key_url) = &repo.key_url
                && !is_http_url(key_url)
            {
                errors.push(ValidationError::new(
                    field("key_url"),
                    format!("'{key_url}' is not a valid http(s) URL"),
                ));
            }
            if !REPO_TYPES.contains(&repo.kind.as_str()) {
                errors.push(ValidationError::new(
                    field("type"),
                    format!("'{}' must be one of {}", repo.kind, REPO_TYPES.join(", ")),
                ));
            }
            if is_blank_or_spaced(&repo.branch) {
                errors.push(ValidationError::new(
                    field("branch"),
                    "must be a non-empty word",
                ));
            }
            let list = repo.source_list.as_str();
            if list.is_empty() || list == "." || list == ".." || list.contains('/') {
                errors.push(ValidationError::new(
                    field("source_list"),
                    format!("'{list}' must be a plain file name"),
                ));
            }
        }

        for (i, package) in self.install.iter().enumerate() {
            if is_blank_or_spaced(&package.name) {
                errors.push(ValidationError::new(
                    format!("install[{i}].package"),
                    "package name must be a non-empty word",
                ));
            }
            if let Some(version) = &package.version
                && is_blank_or_spaced(version)
            {
                errors.push(ValidationError::new(
                    format!("install[{i}].version"),
                    "version must be a non-empty word",
                ));
            }
        }

        errors
    }
}
