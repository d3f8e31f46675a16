//! `envira` command-line entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use envira::cli::Cli;
use envira::commands;
use envira::logging::{self, LOG_FILE_NAME, Logger};
use envira::platform::{self, Platform};
use envira::providers::SystemPaths;

fn main() -> Result<()> {
    let cli = Cli::parse();
    platform::ensure_process_supported()?;
    let platform = Platform::detect()?;

    let log_file = SystemPaths::for_home(&platform.user.home)
        .cache_dir
        .join(LOG_FILE_NAME);
    logging::init_subscriber(cli.verbose, Some(&log_file));
    let log = Arc::new(Logger::new(Some(log_file)));

    commands::apply::run(&cli, platform, &log)
}
