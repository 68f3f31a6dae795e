//! CLI argument definitions using clap

use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

/// Configuration file variable, read when `--config` is absent
pub const ENV_CONFIG: &str = "CATALOGUE_CONFIG";

/// Server-rendered browser for the sakila rental catalogue
#[derive(Parser, Debug, Default)]
#[command(name = "catalogue-web")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Host or IP to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Database connection URL (mysql://, postgres:// or sqlite:)
    #[arg(long)]
    pub database_url: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Override configuration values with any flags given
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url.clone_from(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "catalogue-web",
            "--config",
            "site.toml",
            "--port",
            "8081",
            "--database-url",
            "sqlite:sakila.db",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));

        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.url, "sqlite:sakila.db");
    }

    #[test]
    fn test_no_flags_changes_nothing() {
        let cli = Cli::try_parse_from(["catalogue-web"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_config_path_reads_env() {
        use clap::CommandFactory;

        let command = Cli::command();
        let config = command
            .get_arguments()
            .find(|arg| arg.get_id() == "config")
            .unwrap();
        assert_eq!(config.get_env(), Some(std::ffi::OsStr::new(ENV_CONFIG)));

        // The other variables are applied by AppConfig::apply_env
        for id in ["host", "port", "database_url"] {
            let arg = command.get_arguments().find(|arg| arg.get_id() == id).unwrap();
            assert_eq!(arg.get_env(), None, "{id}");
        }
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["catalogue-web", "--port", "99999"]).is_err());
    }
}
