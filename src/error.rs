//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors; the binary converts them to
//! [`anyhow::Error`] at the command boundary via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! EnviraError
//! ├── Config(ConfigError)           — malformed document, schema violations
//! ├── Environment(EnvironmentError) — config location, remote clone
//! ├── Platform(PlatformError)       — privilege and OS checks
//! └── Provider(ProviderError)       — first failing provider action
//! ```
//!
//! Individual action failures are not errors: they are
//! [`OperationResult`](crate::operations::OperationResult) values that a
//! provider turns into a [`ProviderError`] when it decides to abort.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::operations::OperationResult;

/// Top-level error type for a provisioning run.
#[derive(Error, Debug)]
pub enum EnviraError {
    /// Configuration could not be parsed or validated.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The configuration source could not be located or fetched.
    #[error("environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// The host does not satisfy the process requirements.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// A provider reported a failing action; the pipeline was halted.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors raised while loading or validating the configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The (macro-expanded) document is not valid TOML.
    #[error("malformed document: {0}")]
    Parse(#[from] toml::de::Error),

    /// A section body does not have the expected shape.
    #[error("section [{section}] has an invalid shape: {message}")]
    Shape {
        /// Section key.
        section: String,
        /// Deserializer message.
        message: String,
    },

    /// A section deserialized but violates field-level rules.
    #[error("section [{section}] failed validation:\n{}", format_violations(.errors))]
    Validation {
        /// Section key.
        section: String,
        /// Every violation found, in field order.
        errors: Vec<ValidationError>,
    },
}

fn format_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors raised while resolving where the configuration lives.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The argument is neither a URL nor an existing path.
    #[error("invalid URL or path: {0}")]
    InvalidSource(String),

    /// The directory does not contain the configuration file.
    #[error("config file '{name}' not found in {}", .folder.display())]
    ConfigNotFound {
        /// Directory that was searched.
        folder: PathBuf,
        /// Expected configuration file name.
        name: String,
    },

    /// The given file is not named like the configuration file.
    #[error("file {} does not match config file name '{name}'", .path.display())]
    NameMismatch {
        /// File that was given.
        path: PathBuf,
        /// Expected configuration file name.
        name: String,
    },

    /// A path could not be resolved to its canonical form.
    #[error("cannot resolve {}: {source}", .path.display())]
    Resolve {
        /// Path being resolved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Cloning the remote configuration repository failed.
    #[error("cloning {url} failed: {message}")]
    Clone {
        /// Remote URL.
        url: String,
        /// Reason reported by git.
        message: String,
    },
}

/// Errors raised by process-requirement checks.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The process is not running with effective uid 0.
    #[error("root privileges are required; try again using 'sudo'")]
    NotRoot,

    /// The operating system is not supported.
    #[error("platform {os} is not currently supported")]
    Unsupported {
        /// Name of the detected operating system.
        os: String,
    },

    /// Static facts about the host could not be gathered.
    #[error("platform detection failed: {0}")]
    DetectionFailed(String),
}

/// A provider aborted because one of its actions failed.
#[derive(Error, Debug)]
#[error("[{section}] {result}")]
pub struct ProviderError {
    /// Section key of the failing provider.
    pub section: String,
    /// The failing action's result.
    pub result: OperationResult,
}
