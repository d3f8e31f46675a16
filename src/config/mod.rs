//! Configuration parsing, macro expansion and validation.

pub mod apt;
pub mod env;
pub mod macros;
pub mod validation;

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;
use macros::MacroValues;
use validation::ConfigValidator;

/// The parsed configuration document: section name to section body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    sections: toml::Table,
}

impl Document {
    /// Expand macros in `text` and parse the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the expanded text is not valid TOML.
    pub fn parse(text: &str, values: &MacroValues) -> Result<Self, ConfigError> {
        let expanded = macros::expand(text, values);
        let sections = toml::from_str::<toml::Table>(&expanded)?;
        Ok(Self { sections })
    }

    /// Read the configuration file at `path` and parse it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path, values: &MacroValues) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, values)
    }

    /// Body of section `key`, if present.
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&toml::Value> {
        self.sections.get(key)
    }

    /// Names of all top-level sections.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// Deserialize a section body into its pattern and run the validation pass.
///
/// # Errors
///
/// Returns [`ConfigError::Shape`] when the body does not deserialize and
/// [`ConfigError::Validation`] listing every rule violation otherwise.
pub fn load_pattern<P>(section: &str, body: &toml::Value) -> Result<P, ConfigError>
where
    P: DeserializeOwned + ConfigValidator,
{
    if !body.is_table() {
        return Err(ConfigError::Shape {
            section: section.to_string(),
            message: format!("expected a table, found {}", body.type_str()),
        });
    }

    let pattern: P = body.clone().try_into().map_err(|e: toml::de::Error| {
        ConfigError::Shape {
            section: section.to_string(),
            message: e.message().to_string(),
        }
    })?;

    let errors = pattern.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation {
            section: section.to_string(),
            errors,
        });
    }
    Ok(pattern)
}
