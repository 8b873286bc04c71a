//! Command-line arguments.
//!
//! Flags override values read from the optional `--config` file.

use clap::{CommandFactory, Parser};
use std::path::PathBuf;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::{LogLevel, ProxyConfig};
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "watch-proxy")]
#[command(about = "Reverse proxy with a live terminal view of in-flight requests", long_about = None)]
pub struct Args {
    /// Port to accept client connections on
    #[arg(long, value_name = "PORT")]
    pub listen_port: Option<u16>,

    /// Port of the upstream server
    #[arg(long, value_name = "PORT")]
    pub destination_port: Option<u16>,

    /// Host of the upstream server
    #[arg(long, value_name = "HOST")]
    pub destination_host: Option<String>,

    /// Request TLS towards the upstream (accepted, not implemented)
    #[arg(long, value_name = "BOOLEAN", num_args = 0..=1, default_missing_value = "true")]
    pub https: Option<bool>,

    /// Log verbosity
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// File to write logs to while the dashboard is shown
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<String>,

    /// Dashboard repaint period in milliseconds
    #[arg(long, value_name = "MILLIS")]
    pub refresh_ms: Option<u64>,

    /// Run without the dashboard and log to stdout
    #[arg(long)]
    pub no_dashboard: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Build the validated configuration for this run.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Overlay the flags that were given on `config`.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.listen_port {
            config.listener.port = port;
        }
        if let Some(port) = self.destination_port {
            config.destination.port = port;
        }
        if let Some(host) = &self.destination_host {
            config.destination.host = host.trim().to_string();
        }
        if let Some(https) = self.https {
            config.destination.use_tls = https;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(path) = &self.log_file {
            config.observability.log_file = path.clone();
        }
        if let Some(millis) = self.refresh_ms {
            config.display.refresh_millis = millis;
        }
        if self.no_dashboard {
            config.display.enabled = false;
        }
    }

    /// Usage line printed alongside configuration errors.
    pub fn usage() -> String {
        Self::command().render_usage().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::ValidationError;

    #[test]
    fn parses_equals_style_flags() {
        let args = Args::try_parse_from([
            "watch-proxy",
            "--listen-port=8080",
            "--destination-port=3000",
            "--destination-host=example.internal",
            "--https=true",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.destination.authority(), "example.internal:3000");
        assert!(config.destination.use_tls);
        assert!(config.display.enabled);
    }

    #[test]
    fn bare_https_flag_means_true() {
        let args = Args::try_parse_from(["watch-proxy", "--https"]).unwrap();
        assert_eq!(args.https, Some(true));
    }

    #[test]
    fn missing_ports_fail_validation() {
        let args = Args::try_parse_from(["watch-proxy", "--destination-host=localhost"]).unwrap();
        match args.into_config() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.contains(&ValidationError::MissingListenPort));
                assert!(errors.contains(&ValidationError::MissingDestinationPort));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Args::try_parse_from(["watch-proxy", "--bogus=1"]).is_err());
    }

    #[test]
    fn flags_override_file() {
        let mut config = ProxyConfig::default();
        config.listener.port = 1;
        config.observability.log_level = LogLevel::Error;

        let args = Args::try_parse_from([
            "watch-proxy",
            "--listen-port=9000",
            "--log-level=info",
            "--no-dashboard",
        ])
        .unwrap();
        args.apply(&mut config);

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.observability.log_level, LogLevel::Info);
        assert!(!config.display.enabled);
    }
}
