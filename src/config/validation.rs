//! Field-level validation of deserialized section patterns.
use std::fmt;

/// Minimum length for octal mode strings (after padding).
const OCTAL_MODE_MIN_LEN: usize = 3;

/// Maximum length for octal mode strings.
const OCTAL_MODE_MAX_LEN: usize = 4;

/// A rule violation found in a section body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field (e.g. `repos[0].key_url`).
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    /// Create an error for `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Trait for section patterns that carry rules beyond their shape.
///
/// Implementations report every violation rather than stopping at the
/// first, so a single run shows the user everything that needs fixing.
pub trait ConfigValidator {
    /// Check the pattern and return all violations found.
    fn validate(&self) -> Vec<ValidationError>;
}

/// Normalize a permission mode string.
///
/// Short input is left-padded with zeros to three digits; a four-digit mode
/// must start with `0`, which is dropped.  Every digit must be octal.
///
/// # Errors
///
/// Returns a message describing why the mode is invalid.
///
/// # Examples
///
/// ```
/// use envira::config::validation::normalize_mode;
///
/// assert_eq!(normalize_mode("0755").unwrap(), "755");
/// assert_eq!(normalize_mode("7").unwrap(), "007");
/// assert!(normalize_mode("855").is_err());
/// ```
pub fn normalize_mode(mode: &str) -> Result<String, String> {
    let mode = mode.trim();
    if mode.is_empty() {
        return Err("permission mode is empty".to_string());
    }
    if let Some(c) = mode.chars().find(|c| !('0'..='7').contains(c)) {
        return Err(format!("invalid octal digit '{c}' in mode '{mode}'"));
    }
    if mode.len() > OCTAL_MODE_MAX_LEN {
        return Err(format!(
            "invalid mode length '{mode}': must be at most {OCTAL_MODE_MAX_LEN} digits"
        ));
    }

    let padded = format!("{mode:0>width$}", width = OCTAL_MODE_MIN_LEN);
    match padded.strip_prefix('0') {
        Some(rest) if padded.len() == OCTAL_MODE_MAX_LEN => Ok(rest.to_string()),
        None if padded.len() == OCTAL_MODE_MAX_LEN => Err(format!(
            "invalid mode '{mode}': special bits are not supported, a 4-digit mode must start with 0"
        )),
        _ => Ok(padded),
    }
}

/// `true` when `url` parses with an `http` or `https` scheme and a host.
#[must_use]
pub fn is_http_url(url: &str) -> bool {
    url.parse::<ureq::http::Uri>().is_ok_and(|uri| {
        matches!(uri.scheme_str(), Some("http" | "https")) && uri.host().is_some()
    })
}
