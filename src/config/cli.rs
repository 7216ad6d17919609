//! Command-line flags shared by the server binaries.
//!
//! Flags override values from the optional TOML file. The same overrides are
//! re-applied to every hot-reloaded configuration so a reload never undoes
//! what was given on the command line.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::ServerConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Clone, Default, Parser)]
#[command(version, about = "Minimal hand-rolled HTTP/1.1 server", long_about = None)]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Root directory to serve
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long)]
    pub address: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log request headers and response heads
    #[arg(short, long)]
    pub verbose: bool,

    /// Answer 404 instead of rendering directory listings
    #[arg(long)]
    pub no_listing: bool,

    /// Reload the configuration file when it changes
    #[arg(short, long, requires = "config")]
    pub watch: bool,
}

impl CliArgs {
    /// Load the config file (or defaults), apply the flags on top and
    /// validate the combined result.
    pub fn load_config(&self) -> Result<ServerConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };

        let config = self.apply(base);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Apply the command-line overrides to a configuration.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(root) = &self.root {
            config.static_files.root = root.clone();
        }
        if self.address.is_some() || self.port.is_some() {
            config.listener.bind_address = override_bind(
                &config.listener.bind_address,
                self.address.as_deref(),
                self.port,
            );
        }
        if self.verbose {
            config.observability.verbose = true;
        }
        if self.no_listing {
            config.static_files.directory_listing = false;
        }
        config
    }
}

/// Replace the host and/or port part of a `host:port` bind address.
fn override_bind(bind: &str, address: Option<&str>, port: Option<u16>) -> String {
    let (host, current_port) = bind.rsplit_once(':').unwrap_or((bind, "8080"));

    let host = match address {
        // bare IPv6 literals need brackets in socket address syntax
        Some(a) if a.contains(':') && !a.starts_with('[') => format!("[{}]", a),
        Some(a) if a == "localhost" => "127.0.0.1".to_string(),
        Some(a) => a.to_string(),
        None => host.to_string(),
    };
    let port = port
        .map(|p| p.to_string())
        .unwrap_or_else(|| current_port.to_string());

    format!("{}:{}", host, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_bind() {
        assert_eq!(override_bind("127.0.0.1:8080", None, Some(8000)), "127.0.0.1:8000");
        assert_eq!(override_bind("127.0.0.1:8080", Some("0.0.0.0"), None), "0.0.0.0:8080");
        assert_eq!(override_bind("127.0.0.1:8080", Some("localhost"), Some(1)), "127.0.0.1:1");
        assert_eq!(override_bind("[::1]:8080", None, Some(9)), "[::1]:9");
        assert_eq!(override_bind("127.0.0.1:8080", Some("::"), None), "[::]:8080");
    }

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::parse_from([
            "minimal-http-server",
            "--root",
            "/tmp",
            "--port",
            "9000",
            "--verbose",
            "--no-listing",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.static_files.root, PathBuf::from("/tmp"));
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert!(config.observability.verbose);
        assert!(!config.static_files.directory_listing);
    }

    #[test]
    fn test_watch_requires_config() {
        assert!(CliArgs::try_parse_from(["minimal-http-server", "--watch"]).is_err());
    }

    #[test]
    fn test_flags_can_fix_invalid_file_values() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[listener]\nbind_address = \"nowhere\"\n").unwrap();
        let config_path = file.path().to_str().unwrap();

        let args = CliArgs::parse_from(["minimal-http-server", "--config", config_path]);
        assert!(matches!(args.load_config(), Err(ConfigError::Validation(_))));

        let args = CliArgs::parse_from([
            "minimal-http-server",
            "--config",
            config_path,
            "--address",
            "127.0.0.1",
            "--port",
            "9000",
        ]);
        assert_eq!(args.load_config().unwrap().listener.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = CliArgs::parse_from(["minimal-http-server", "--address", "not an address"]);
        assert!(matches!(args.load_config(), Err(ConfigError::Validation(_))));
    }
}
