#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for the apply pipeline.
//!
//! Each test runs the same entry point as the binary against a sandboxed
//! environment folder and a fake apt host.

mod common;

use std::sync::Arc;

use common::{FakeApt, TestEnvironmentBuilder};
use envira::error::{ConfigError, EnviraError};
use envira::logging::StepStatus;
use envira::providers;

// ---------------------------------------------------------------------------
// Snapshot: provider registry
// ---------------------------------------------------------------------------

/// Regression guard on provider order: adding, removing or re-prioritizing a
/// provider must be a deliberate snapshot update.
#[test]
fn provider_registry() {
    let rows: Vec<String> = providers::registry()
        .iter()
        .map(|e| format!("{} (priority {})", e.section_key, e.priority))
        .collect();
    insta::assert_snapshot!("provider_registry", rows.join("\n"));
}

// ---------------------------------------------------------------------------
// End-to-end
// ---------------------------------------------------------------------------

const CURL_CONFIG: &str = r#"
[apt]
repos = ["http://example.test/repo"]
install = ["curl"]
"#;

#[test]
fn repository_and_package_are_applied() {
    let env = TestEnvironmentBuilder::new().with_config(CURL_CONFIG).build();
    let apt = Arc::new(FakeApt::new().with_package("curl", "7.81.0-1ubuntu1.15"));

    let (result, log) = env.apply(&apt, false);

    result.unwrap();
    assert_eq!(
        std::fs::read_to_string(env.source_list()).unwrap(),
        "deb http://example.test/repo jammy main\n"
    );
    assert_eq!(
        apt.calls(),
        vec![
            "apt-get update",
            "apt-get install -y curl",
            "apt-cache policy curl",
        ]
    );
    assert_eq!(log.steps()[0].status, StepStatus::Ok);
}

#[test]
fn second_run_changes_nothing() {
    let env = TestEnvironmentBuilder::new().with_config(CURL_CONFIG).build();
    let apt = Arc::new(FakeApt::new().with_package("curl", "7.81.0-1ubuntu1.15"));

    env.apply(&apt, false).0.unwrap();
    let first = std::fs::read_to_string(env.source_list()).unwrap();
    env.apply(&apt, false).0.unwrap();

    assert_eq!(std::fs::read_to_string(env.source_list()).unwrap(), first);
    assert_eq!(apt.calls().len(), 6, "each run refreshes and re-reads the version");
}

#[test]
fn second_run_reports_installed_version() {
    let env = TestEnvironmentBuilder::new().with_config(CURL_CONFIG).build();
    let apt = Arc::new(FakeApt::new().with_package("curl", "7.81.0-1ubuntu1.15"));

    env.apply(&apt, false).0.unwrap();
    let results = env.section_results("apt", &apt);

    assert!(results.iter().all(envira::operations::OperationResult::is_ok));
    let install = results.last().unwrap();
    assert_eq!(install.command.as_deref(), Some("apt-cache policy curl"));
    assert_eq!(install.data.as_deref(), Some("7.81.0-1ubuntu1.15"));
    assert_eq!(
        std::fs::read_to_string(env.source_list()).unwrap(),
        "deb http://example.test/repo jammy main\n",
        "repository line is left as it was"
    );
}

#[test]
fn duplicate_repository_requires_force() {
    let env = TestEnvironmentBuilder::new()
        .with_config(CURL_CONFIG)
        .with_source_list("deb http://example.test/repo focal main\n")
        .build();
    let apt = Arc::new(FakeApt::new().with_package("curl", "7.81.0-1ubuntu1.15"));

    let (result, log) = env.apply(&apt, false);
    let err = result.unwrap_err();
    assert!(matches!(err, EnviraError::Provider(_)));
    assert!(err.to_string().contains("duplicated"));
    assert!(apt.calls().is_empty(), "nothing runs after the failing repository");
    assert_eq!(log.failure_count(), 1);

    env.apply(&apt, true).0.unwrap();
    assert_eq!(
        std::fs::read_to_string(env.source_list()).unwrap(),
        "deb http://example.test/repo jammy main\n"
    );
}

#[test]
fn apt_failure_stops_env_section() {
    let env = TestEnvironmentBuilder::new()
        .with_config(
            "[apt]\n[[env.exec]]\ncommand = \"touch /tmp/never\"\nas_root = true\n",
        )
        .build();
    let apt = Arc::new(FakeApt::new().failing("apt-get update"));

    let (result, log) = env.apply(&apt, false);

    assert!(result.is_err());
    assert_eq!(apt.calls(), vec!["apt-get update"]);
    let statuses: Vec<_> = log.steps().iter().map(|s| s.status).collect();
    assert_eq!(statuses, vec![StepStatus::Failed, StepStatus::NotRun]);
}

#[test]
fn copy_source_outside_environment_is_rejected() {
    let builder = TestEnvironmentBuilder::new();
    let outside = builder.sandbox().join("outside.txt");
    std::fs::write(&outside, "secret").unwrap();
    let dest = builder.home().join("copied.txt");
    let env = builder
        .with_config(&format!(
            "[[env.copy]]\nsource = \"{}\"\ndest = \"{}\"\n",
            outside.display(),
            dest.display()
        ))
        .build();
    let apt = Arc::new(FakeApt::new());

    let (result, _) = env.apply(&apt, true);

    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("outside of environment folder")
    );
    assert!(!dest.exists());
}

#[test]
fn linked_dotfile_and_tree_are_idempotent() {
    let builder = TestEnvironmentBuilder::new().with_file("bashrc", "export EDITOR=vim\n");
    let link = builder.home().join(".bashrc");
    let env = builder
        .with_config(&format!(
            "[[env.copy]]\nsource = \"bashrc\"\ndest = \"{}\"\nas_link = true\n\n\
             [env.dirtree]\nroot = \"~\"\n[env.dirtree.tree.code]\nmode = \"0700\"\n",
            link.display()
        ))
        .build();
    // Owner changes need real root privileges.
    let apt = Arc::new(FakeApt::new());

    let first = env.apply_as_root_user(&apt);
    let second = env.apply_as_root_user(&apt);

    first.unwrap();
    second.unwrap();
    assert!(link.is_symlink());
    assert_eq!(std::fs::read_to_string(&link).unwrap(), "export EDITOR=vim\n");
    assert!(env.home().join("code").is_dir());
}

#[test]
fn validation_errors_abort_before_any_change() {
    let env = TestEnvironmentBuilder::new()
        .with_config(
            "[apt]\ninstall = [\"curl\"]\n[env.dirtree.tree.a]\nmode = \"855\"\n",
        )
        .build();
    let apt = Arc::new(FakeApt::new());

    let (result, _) = env.apply(&apt, false);

    match result.unwrap_err() {
        EnviraError::Config(ConfigError::Validation { section, errors }) => {
            assert_eq!(section, "env");
            assert_eq!(errors[0].field, "dirtree.tree.a.mode");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(apt.calls().is_empty());
}

#[test]
fn missing_environment_path_is_rejected() {
    let env = TestEnvironmentBuilder::new().with_config("").build();
    let apt = Arc::new(FakeApt::new());
    std::fs::remove_file(env.folder.path().join("envira.toml")).unwrap();

    let (result, _) = env.apply(&apt, false);

    assert!(result.unwrap_err().to_string().contains("not found"));
}
