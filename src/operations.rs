//! The uniform outcome record produced by every provider action.

use std::fmt;

use crate::exec::ExecResult;

/// Outcome of a single external action (command, download, filesystem change).
///
/// `error` being set means the action failed; everything else is context for
/// the diagnostic.  `data` carries an action-specific payload on success, such
/// as the resolved keyring path or an installed package version.
///
/// # Examples
///
/// ```
/// use envira::operations::OperationResult;
///
/// let ok = OperationResult::ok().with_data("7.81.0");
/// assert!(ok.is_ok());
///
/// let failed = OperationResult::failed("repository duplicated");
/// assert!(failed.is_err());
/// ```
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResult {
    /// Command line that was run, if any.
    pub command: Option<String>,
    /// Exit code of the command, if it ran to completion.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub output: Option<String>,
    /// Failure reason; `None` on success.
    pub error: Option<String>,
    /// Success payload.
    pub data: Option<String>,
}

impl OperationResult {
    /// A clean result with nothing attached.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// A failed result carrying `reason`.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Build a result from a finished command.
    ///
    /// The action fails when the command exits non-zero.  The reason is the
    /// trimmed stderr, falling back to stdout when stderr is empty, and to
    /// the exit code when both are empty.
    #[must_use]
    pub fn from_exec(command: String, result: &ExecResult) -> Self {
        let error = (!result.success).then(|| failure_reason(result));
        Self {
            command: Some(command),
            exit_code: result.code,
            output: Some(result.stdout.clone()),
            error,
            data: None,
        }
    }

    /// Build a failed result for a command that could not be spawned.
    #[must_use]
    pub fn spawn_failed(command: String, err: &anyhow::Error) -> Self {
        Self {
            command: Some(command),
            error: Some(format!("{err:#}")),
            ..Self::default()
        }
    }

    /// Attach a success payload.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach the command line this result describes.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// `true` when the action succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// `true` when the action failed.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Pick the most useful failure text out of a finished command.
pub(crate) fn failure_reason(result: &ExecResult) -> String {
    let stderr = result.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = result.stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    result.code.map_or_else(
        || "terminated by signal".to_string(),
        |code| format!("exited with code {code}"),
    )
}

impl fmt::Display for OperationResult {
    /// Renders the one-line diagnostic printed for a failing action.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.command {
            Some(cmd) => write!(f, "command '{cmd}' ")?,
            None => write!(f, "operation ")?,
        }
        match (&self.error, self.exit_code) {
            (Some(reason), Some(code)) if code != 0 => {
                write!(f, "failed with exit code {code}, reason: {reason}")
            }
            (Some(reason), _) => write!(f, "failed, reason: {reason}"),
            (None, _) => write!(f, "succeeded"),
        }
    }
}
