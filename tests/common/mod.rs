// Shared helpers for integration tests.
//
// Provides a sandboxed environment folder plus a fake apt host so each test
// can run the full apply pipeline without touching the real machine.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use envira::commands::apply::{ApplyRequest, Host, execute};
use envira::config::Document;
use envira::config::macros::MacroValues;
use envira::environment::Environment;
use envira::error::EnviraError;
use envira::exec::{ExecResult, Executor, command_line};
use envira::logging::{Log, Logger};
use envira::operations::OperationResult;
use envira::platform::{Os, OsRelease, Platform, UserInfo};
use envira::providers::{self, Context, SystemPaths};
use envira::resources::keyring::KeyFetcher;

/// Executor that behaves like a healthy Debian host: apt commands succeed,
/// `apt-cache policy` reports the versions in `installed`, and anything
/// listed in `failing` exits 100.
#[derive(Debug, Default)]
pub struct FakeApt {
    installed: BTreeMap<String, String>,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeApt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `name` as installed at `version` after installation.
    pub fn with_package(mut self, name: &str, version: &str) -> Self {
        self.installed.insert(name.to_string(), version.to_string());
        self
    }

    /// Make any command line starting with `prefix` fail.
    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    fn respond(&self, program: &str, args: &[&str]) -> ExecResult {
        let line = command_line(program, args);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        if self.failing.iter().any(|p| line.starts_with(p)) {
            return ExecResult {
                stdout: String::new(),
                stderr: format!("E: {line} failed"),
                success: false,
                code: Some(100),
            };
        }
        let stdout = match (program, args) {
            ("apt-cache", ["policy", name]) => self.installed.get(*name).map_or_else(
                || format!("{name}:\n  Installed: (none)\n"),
                |v| format!("{name}:\n  Installed: {v}\n  Candidate: {v}\n"),
            ),
            _ => String::new(),
        };
        ExecResult {
            stdout,
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }
}

impl Executor for FakeApt {
    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        Ok(self.respond(program, args))
    }

    fn run_in_with_env(
        &self,
        _dir: &Path,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> anyhow::Result<ExecResult> {
        Ok(self.respond(program, args))
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/bin").join(program))
    }
}

/// Key fetcher for a host without network access.
#[derive(Debug, Default)]
pub struct Offline;

impl KeyFetcher for Offline {
    fn fetch(&self, url: &str, _timeout: Duration) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("no network for {url}")
    }
}

/// An environment folder and a sandbox standing in for `/etc`, `/usr/share`
/// and the user's home.
pub struct TestEnvironment {
    pub folder: tempfile::TempDir,
    pub sandbox: tempfile::TempDir,
}

impl TestEnvironment {
    pub fn home(&self) -> PathBuf {
        self.sandbox.path().join("home")
    }

    pub fn source_list(&self) -> PathBuf {
        self.sandbox.path().join("sources.list.d/envira.list")
    }

    /// Platform of a root process started with sudo by `dev`.
    pub fn platform(&self) -> Platform {
        Platform::new(
            Os::Linux,
            OsRelease {
                id: "ubuntu".into(),
                version: "22.04".into(),
                codename: "jammy".into(),
            },
            UserInfo {
                name: "dev".into(),
                uid: 1000,
                gid: 1000,
                home: self.home(),
            },
            0,
        )
    }

    /// Platform of a root login shell: no sudo, no privilege drop.
    pub fn root_platform(&self) -> Platform {
        let mut platform = self.platform();
        platform.user = UserInfo {
            name: "root".into(),
            uid: 0,
            gid: 0,
            home: self.home(),
        };
        platform
    }

    /// Run the apply command against this environment on `platform`.
    pub fn apply_on(
        &self,
        platform: Platform,
        executor: &Arc<FakeApt>,
        force: bool,
    ) -> (Result<(), EnviraError>, Arc<Logger>) {
        let log = Arc::new(Logger::new(None));
        let request = ApplyRequest {
            path_or_url: self.folder.path().display().to_string(),
            config_name: "envira.toml".to_string(),
            force,
        };
        let host = Host {
            platform,
            paths: SystemPaths::under(self.sandbox.path()),
            executor: Arc::clone(executor) as Arc<dyn Executor>,
            keys: Arc::new(Offline),
        };
        (execute(&request, host, &log), log)
    }

    /// Run as root started through sudo by `dev`.
    pub fn apply(&self, executor: &Arc<FakeApt>, force: bool) -> (Result<(), EnviraError>, Arc<Logger>) {
        self.apply_on(self.platform(), executor, force)
    }

    /// Apply only section `key` and return its per-action results.
    pub fn section_results(&self, key: &str, executor: &Arc<FakeApt>) -> Vec<OperationResult> {
        let platform = self.platform();
        let environment =
            Environment::resolve(self.folder.path(), "envira.toml").expect("resolve environment");
        let document = Document::load(
            environment.config_path(),
            &MacroValues::from_platform(&platform),
        )
        .expect("load document");
        let entry = providers::registry()
            .into_iter()
            .find(|e| e.section_key == key)
            .expect("registered section");
        let provider =
            (entry.build)(document.section(key).expect("section present")).expect("valid section");

        let ctx = Context {
            environment: Arc::new(environment),
            platform: Arc::new(platform),
            paths: Arc::new(SystemPaths::under(self.sandbox.path())),
            executor: Arc::clone(executor) as Arc<dyn Executor>,
            keys: Arc::new(Offline),
            log: Arc::new(Logger::new(None)) as Arc<dyn Log>,
            force: false,
        };
        provider.apply(&ctx).expect("section applies")
    }

    /// Run as a plain root login, so no ownership changes are attempted.
    pub fn apply_as_root_user(&self, executor: &Arc<FakeApt>) -> Result<(), EnviraError> {
        self.apply_on(self.root_platform(), executor, false).0
    }
}

/// Fluent builder for [`TestEnvironment`].
pub struct TestEnvironmentBuilder {
    env: TestEnvironment,
}

impl TestEnvironmentBuilder {
    pub fn new() -> Self {
        let env = TestEnvironment {
            folder: tempfile::tempdir().expect("create env dir"),
            sandbox: tempfile::tempdir().expect("create sandbox dir"),
        };
        std::fs::create_dir_all(env.home()).expect("create home");
        Self { env }
    }

    /// The sandboxed home of the invoking user.
    pub fn home(&self) -> PathBuf {
        self.env.home()
    }

    /// The sandbox root.
    pub fn sandbox(&self) -> &Path {
        self.env.sandbox.path()
    }

    /// Write the configuration document.
    pub fn with_config(self, content: &str) -> Self {
        std::fs::write(self.env.folder.path().join("envira.toml"), content)
            .expect("write envira.toml");
        self
    }

    /// Write a file into the environment folder.
    pub fn with_file(self, name: &str, content: &str) -> Self {
        let path = self.env.folder.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write env file");
        self
    }

    /// Pre-populate the source list file.
    pub fn with_source_list(self, content: &str) -> Self {
        let path = self.env.source_list();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create sources.list.d");
        }
        std::fs::write(path, content).expect("write source list");
        self
    }

    pub fn build(self) -> TestEnvironment {
        self.env
    }
}
