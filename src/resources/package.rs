//! Apt package operations.
use std::path::Path;

use crate::config::apt::Package;
use crate::exec::{Executor, command_line};
use crate::operations::OperationResult;

/// Environment applied to every apt invocation.
const APT_ENV: &[(&str, &str)] = &[("DEBIAN_FRONTEND", "noninteractive")];

/// Run an apt command non-interactively and wrap the outcome.
fn apt(executor: &dyn Executor, program: &str, args: &[&str]) -> OperationResult {
    let line = command_line(program, args);
    tracing::debug!("running: {line}");
    match executor.run_in_with_env(Path::new("/"), program, args, APT_ENV) {
        Ok(res) => OperationResult::from_exec(line, &res),
        Err(e) => OperationResult::spawn_failed(line, &e),
    }
}

/// `apt-get update`.
pub fn update(executor: &dyn Executor) -> OperationResult {
    apt(executor, "apt-get", &["update"])
}

/// `apt-get upgrade -y`.
pub fn upgrade(executor: &dyn Executor) -> OperationResult {
    apt(executor, "apt-get", &["upgrade", "-y"])
}

/// Install `package` and read back the installed version.
///
/// On success the result's `data` holds the installed version.  A pinned
/// package fails when apt reports a different version after installation.
pub fn install(executor: &dyn Executor, package: &Package) -> OperationResult {
    let arg = package.install_arg();
    let result = apt(executor, "apt-get", &["install", "-y", arg.as_str()]);
    if result.is_err() {
        return result;
    }

    let policy = apt(executor, "apt-cache", &["policy", package.name.as_str()]);
    if policy.is_err() {
        return policy;
    }

    let Some(version) = policy.output.as_deref().and_then(installed_version) else {
        return OperationResult::failed(format!(
            "package '{}' is not installed after apt-get install",
            package.name
        ))
        .with_command(policy.command.unwrap_or_default());
    };

    if let Some(pin) = &package.version
        && pin != &version
    {
        return OperationResult::failed(format!(
            "package '{}' is at version {version}, expected {pin}",
            package.name
        ))
        .with_command(policy.command.unwrap_or_default());
    }

    policy.with_data(version)
}

/// Extract the `Installed:` version from `apt-cache policy` output.
///
/// Returns `None` when the package is not installed.
#[must_use]
pub fn installed_version(policy_output: &str) -> Option<String> {
    policy_output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Installed:"))
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "(none)")
        .map(str::to_string)
}
