//! Section providers and the fixed registry that dispatches to them.
pub mod apt;
pub mod context;
pub mod env;

pub use context::{Context, SystemPaths};

use serde::de::DeserializeOwned;

use crate::config::validation::ConfigValidator;
use crate::error::{ConfigError, ProviderError};
use crate::operations::OperationResult;

/// Applies one configuration section.
pub trait Provider: std::fmt::Debug {
    /// Top-level key of the section this provider owns.
    fn section_key(&self) -> &'static str;

    /// Lower priorities apply earlier.
    fn priority(&self) -> u32;

    /// Apply the section.
    ///
    /// Returns one result per action that ran.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] carrying the first failing action; the
    /// actions after it are not run.
    fn apply(&self, ctx: &Context) -> Result<Vec<OperationResult>, ProviderError>;
}

/// A provider built from a validated section pattern.
pub trait SectionProvider: Provider + Sized + 'static {
    /// Section key.
    const SECTION_KEY: &'static str;
    /// Application priority.
    const PRIORITY: u32;
    /// Typed shape of the section.
    type Pattern: DeserializeOwned + ConfigValidator;

    /// Wrap an already validated pattern.
    fn from_pattern(pattern: Self::Pattern) -> Self;

    /// Deserialize and validate `body`, then build the provider.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the section is malformed.
    fn from_section(body: &toml::Value) -> Result<Self, ConfigError> {
        crate::config::load_pattern(Self::SECTION_KEY, body).map(Self::from_pattern)
    }
}

/// Registry row: how to build the provider for a section key.
#[derive(Debug, Clone, Copy)]
pub struct ProviderEntry {
    /// Section key.
    pub section_key: &'static str,
    /// Application priority.
    pub priority: u32,
    /// Constructor from the raw section body.
    pub build: fn(&toml::Value) -> Result<Box<dyn Provider>, ConfigError>,
}

impl ProviderEntry {
    /// Registry row for `P`.
    #[must_use]
    pub fn of<P: SectionProvider>() -> Self {
        Self {
            section_key: P::SECTION_KEY,
            priority: P::PRIORITY,
            build: build_boxed::<P>,
        }
    }
}

fn build_boxed<P: SectionProvider>(body: &toml::Value) -> Result<Box<dyn Provider>, ConfigError> {
    Ok(Box::new(P::from_section(body)?))
}

/// Every known provider, ordered by ascending priority.
///
/// The sort is stable, so equal priorities keep registration order.
#[must_use]
pub fn registry() -> Vec<ProviderEntry> {
    let mut entries = vec![
        ProviderEntry::of::<apt::AptProvider>(),
        ProviderEntry::of::<env::EnvProvider>(),
    ];
    entries.sort_by_key(|e| e.priority);
    entries
}

/// Collects the results of a provider's actions and stops at the first
/// failure.
#[derive(Debug)]
pub(crate) struct Outcomes {
    section: &'static str,
    results: Vec<OperationResult>,
}

impl Outcomes {
    pub(crate) const fn new(section: &'static str) -> Self {
        Self {
            section,
            results: Vec::new(),
        }
    }

    /// Keep a successful result, or turn a failed one into the provider's
    /// error.
    pub(crate) fn push(&mut self, result: OperationResult) -> Result<(), ProviderError> {
        if result.is_err() {
            return Err(ProviderError {
                section: self.section.to_string(),
                result,
            });
        }
        self.results.push(result);
        Ok(())
    }

    pub(crate) fn finish(self) -> Vec<OperationResult> {
        self.results
    }
}
