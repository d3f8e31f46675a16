//! The apply command: the only thing the binary does.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::Cli;
use crate::configurator;
use crate::environment::Environment;
use crate::error::EnviraError;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::platform::Platform;
use crate::providers::{Context, SystemPaths};
use crate::remote;
use crate::resources::keyring::{HttpKeyFetcher, KeyFetcher};

/// What to apply.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    /// Environment folder, config file, or git URL.
    pub path_or_url: String,
    /// Configuration file name inside the folder.
    pub config_name: String,
    /// Replace conflicting state.
    pub force: bool,
}

impl From<&Cli> for ApplyRequest {
    fn from(cli: &Cli) -> Self {
        Self {
            path_or_url: cli.path_or_url.clone(),
            config_name: cli.config_name.clone(),
            force: cli.force,
        }
    }
}

/// The machine being provisioned and the handles used to change it.
pub struct Host {
    /// Detected platform facts.
    pub platform: Platform,
    /// System directories.
    pub paths: SystemPaths,
    /// Runs external commands.
    pub executor: Arc<dyn Executor>,
    /// Downloads signing keys.
    pub keys: Arc<dyn KeyFetcher>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("platform", &self.platform)
            .field("paths", &self.paths)
            .field("executor", &"<dyn Executor>")
            .field("keys", &"<dyn KeyFetcher>")
            .finish()
    }
}

impl Host {
    /// The real machine: standard paths, spawned processes, HTTP downloads.
    #[must_use]
    pub fn system(platform: Platform) -> Self {
        let paths = SystemPaths::for_home(&platform.user.home);
        Self {
            platform,
            paths,
            executor: Arc::new(SystemExecutor),
            keys: Arc::new(HttpKeyFetcher),
        }
    }
}

/// Check the process requirements, resolve the environment and apply its
/// configuration.
///
/// # Errors
///
/// Returns the first fatal condition: missing privileges, an unsupported
/// platform, an unresolvable source, a configuration error, or a provider
/// failure.
pub fn execute(request: &ApplyRequest, host: Host, log: &Arc<Logger>) -> Result<(), EnviraError> {
    host.platform.ensure_supported()?;

    log.stage("Resolving environment");
    let source = remote::resolve_source(&request.path_or_url, &host.paths.cache_dir)?;
    let environment = Environment::resolve(&source, &request.config_name)?;
    log.info(&format!("folder: {}", environment.folder_path().display()));
    log.debug(&format!(
        "platform: {} {} ({}), user {}",
        host.platform.release.id,
        host.platform.release.version,
        host.platform.release.codename,
        host.platform.user.name
    ));

    let ctx = Context {
        environment: Arc::new(environment),
        platform: Arc::new(host.platform),
        paths: Arc::new(host.paths),
        executor: host.executor,
        keys: host.keys,
        log: Arc::clone(log) as Arc<dyn Log>,
        force: request.force,
    };

    let result = configurator::load_environment(&ctx);
    log.print_summary();
    result
}

/// Run the apply command on the real machine.
///
/// # Errors
///
/// Returns an error if any step of [`execute`] fails.
pub fn run(cli: &Cli, platform: Platform, log: &Arc<Logger>) -> Result<()> {
    let version = option_env!("ENVIRA_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("envira {version}"));

    execute(&ApplyRequest::from(cli), Host::system(platform), log).map_err(halted)
}

/// The error reported when a run stops.
///
/// A provider failure has already been logged with its diagnostic, so only
/// the failing section is named here.
fn halted(error: EnviraError) -> anyhow::Error {
    match error {
        EnviraError::Provider(e) => {
            anyhow::anyhow!("provisioning halted: provider [{}] failed", e.section)
        }
        other => other.into(),
    }
}
