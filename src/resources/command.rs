//! Shell command execution with a privilege policy.
use std::path::PathBuf;

use crate::exec::{Executor, command_line};
use crate::operations::OperationResult;

/// Shell used when an entry does not name one.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// What the shell is asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    /// `shell -c <command>`.
    Inline(String),
    /// `shell <script>`.
    Script(PathBuf),
}

/// A fully-resolved command ready to run.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    /// Inline command or script.
    pub input: ShellInput,
    /// Shell executable path.
    pub shell: PathBuf,
    /// Extra environment variables, in a stable order.
    pub env: Vec<(String, String)>,
    /// Drop privileges to this user via `sudo`; `None` runs directly.
    pub run_as: Option<String>,
    /// Working directory.
    pub workdir: PathBuf,
}

/// Resolve the shell for an entry.
///
/// The default shell is used as-is; a custom one must resolve to an
/// existing executable.
///
/// # Errors
///
/// Returns a failed result naming the shell when it cannot be found.
pub fn resolve_shell(
    executor: &dyn Executor,
    shell: Option<&str>,
) -> Result<PathBuf, OperationResult> {
    match shell {
        None => Ok(PathBuf::from(DEFAULT_SHELL)),
        Some(name) => executor
            .resolve(name)
            .ok_or_else(|| OperationResult::failed(format!("shell '{name}' not found"))),
    }
}

impl ShellCommand {
    /// Program and arguments to spawn, plus the environment to pass
    /// through the executor.
    ///
    /// `sudo` resets the environment, so when dropping privileges the
    /// variables are passed through `env` on the command line instead.
    fn argv(&self) -> (String, Vec<String>, Vec<(String, String)>) {
        let shell = self.shell.display().to_string();
        let mut shell_args = match &self.input {
            ShellInput::Inline(cmd) => vec!["-c".to_string(), cmd.clone()],
            ShellInput::Script(path) => vec![path.display().to_string()],
        };

        match &self.run_as {
            Some(user) => {
                let mut args = vec![
                    "-u".to_string(),
                    user.clone(),
                    "-H".to_string(),
                    "--".to_string(),
                    "env".to_string(),
                ];
                args.extend(self.env.iter().map(|(k, v)| format!("{k}={v}")));
                args.push(shell);
                args.append(&mut shell_args);
                ("sudo".to_string(), args, Vec::new())
            }
            None => (shell, shell_args, self.env.clone()),
        }
    }

    /// Run the command.
    ///
    /// A non-zero exit fails.  So does output on stderr even when the exit
    /// code is zero.  With an empty stderr the failure reason is stdout.
    pub fn run(&self, executor: &dyn Executor) -> OperationResult {
        let (program, args, env) = self.argv();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let line = command_line(&program, &args);
        tracing::debug!("running: {line} (in {})", self.workdir.display());

        match executor.run_in_with_env(&self.workdir, &program, &args, &env) {
            Ok(res) => {
                let mut result = OperationResult::from_exec(line, &res);
                let stderr = res.stderr.trim();
                if result.is_ok() && !stderr.is_empty() {
                    result.error = Some(stderr.to_string());
                }
                result
            }
            Err(e) => OperationResult::spawn_failed(line, &e),
        }
    }
}
