//! Command-line argument definitions.

use clap::Parser;

use crate::environment::DEFAULT_CONFIG_NAME;

/// Command-line interface of the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "envira",
    about = "Declarative, idempotent machine provisioning",
    version
)]
pub struct Cli {
    /// Environment folder, config file, or git URL to clone
    pub path_or_url: String,

    /// Name of the configuration file inside the environment folder
    #[arg(
        short,
        long,
        env = "ENVIRA_CONFIG_NAME",
        default_value = DEFAULT_CONFIG_NAME
    )]
    pub config_name: String,

    /// Overwrite conflicting files and replace duplicated repositories
    #[arg(short, long)]
    pub force: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_path_with_defaults() {
        let cli = Cli::parse_from(["envira", "/srv/setup"]);
        assert_eq!(cli.path_or_url, "/srv/setup");
        assert!(!cli.force);
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_config_name_short() {
        let cli = Cli::parse_from(["envira", "-c", "workstation.toml", "."]);
        assert_eq!(cli.config_name, "workstation.toml");
    }

    #[test]
    fn parse_force_and_verbose() {
        let cli = Cli::parse_from(["envira", "--force", "-v", "https://example.test/setup.git"]);
        assert!(cli.force);
        assert!(cli.verbose);
        assert_eq!(cli.path_or_url, "https://example.test/setup.git");
    }

    #[test]
    fn path_is_required() {
        assert!(Cli::try_parse_from(["envira"]).is_err());
    }
}
