//! External command execution behind an injectable [`Executor`].
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code; `None` when killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Render a program and its arguments as a single human-readable line.
#[must_use]
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Abstraction over process spawning so providers can be tested without
/// touching the package manager or a real shell.
///
/// Every method returns the captured result even when the process exits
/// non-zero; only a failure to spawn is reported as `Err`.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `program` with `args` and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run `program` in `dir` with extra environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn run_in_with_env(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Resolve `program` to an executable path, searching `PATH` for bare names.
    fn resolve(&self, program: &str) -> Option<PathBuf>;
}

/// Production [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn run_in_with_env(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        for (k, v) in env {
            cmd.env(k, v);
        }
        let output = cmd
            .output()
            .with_context(|| format!("failed to execute: {program} in {}", dir.display()))?;
        Ok(ExecResult::from(output))
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn run_unchecked_captures_stdout() {
        let result = SystemExecutor.run_unchecked("echo", &["hello"]).unwrap();
        assert!(result.success, "echo command should succeed");
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_unchecked_failure_sets_success_false() {
        let result = SystemExecutor.run_unchecked("false", &[]).unwrap();
        assert!(!result.success, "non-zero exit should set success=false");
        assert_eq!(result.code, Some(1));
    }

    #[test]
    fn run_unchecked_missing_program_is_error() {
        let result = SystemExecutor.run_unchecked("this-program-does-not-exist-12345", &[]);
        assert!(result.is_err(), "spawn failure should be an error");
    }

    #[test]
    fn run_in_with_env_passes_variables_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = SystemExecutor
            .run_in_with_env(
                dir.path(),
                "sh",
                &["-c", "echo \"$GREETING\"; pwd"],
                &[("GREETING", "hi")],
            )
            .unwrap();
        assert!(result.success);
        let mut lines = result.stdout.lines();
        assert_eq!(lines.next(), Some("hi"));
        let cwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(
            dunce::canonicalize(cwd).unwrap(),
            dunce::canonicalize(dir.path()).unwrap()
        );
    }

    #[test]
    fn resolve_finds_known_program() {
        assert!(SystemExecutor.resolve("sh").is_some(), "sh should be on PATH");
    }

    #[test]
    fn resolve_missing_program() {
        assert!(
            SystemExecutor
                .resolve("this-program-does-not-exist-12345")
                .is_none()
        );
    }

    #[test]
    fn command_line_joins_program_and_args() {
        assert_eq!(
            command_line("apt-get", &["install", "-y", "curl"]),
            "apt-get install -y curl"
        );
        assert_eq!(command_line("apt-get", &[]), "apt-get");
    }
}
