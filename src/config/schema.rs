//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// The single upstream every request is forwarded to.
    pub destination: DestinationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Terminal dashboard settings.
    pub display: DisplayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Shutdown policy.
    pub shutdown: ShutdownConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Port to listen on. Zero means "not configured".
    pub port: u16,

    /// Optional cap on concurrent connections. Unbounded when absent.
    pub max_connections: Option<usize>,
}

impl ListenerConfig {
    /// Bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", bracket_ipv6(&self.bind_host), self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 0,
            max_connections: None,
        }
    }
}

/// Upstream destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Upstream host name or address.
    pub host: String,

    /// Upstream port. Zero means "not configured".
    pub port: u16,

    /// Accepted but has no effect; traffic is plain HTTP.
    pub use_tls: bool,
}

impl DestinationConfig {
    /// URI authority (`host:port`) of the upstream.
    pub fn authority(&self) -> String {
        format!("{}:{}", bracket_ipv6(&self.host), self.port)
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
            use_tls: false,
        }
    }
}

fn bracket_ipv6(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Timeout configuration for upstream requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the upstream to produce response headers, in seconds.
    pub response_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn response(&self) -> Duration {
        Duration::from_secs(self.response_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            response_secs: 30,
        }
    }
}

/// Terminal dashboard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Draw the dashboard. When false, logs go to stdout instead.
    pub enabled: bool,

    /// Repaint period in milliseconds.
    pub refresh_millis: u64,

    /// Number of rows reserved for ongoing requests.
    pub open_rows: usize,

    /// Ongoing requests older than this are highlighted.
    pub slow_request_millis: u64,
}

impl DisplayConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_millis)
    }

    pub fn slow_after(&self) -> Duration {
        Duration::from_millis(self.slow_request_millis)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_millis: 1000,
            open_rows: 6,
            slow_request_millis: 5000,
        }
    }
}

/// Log verbosity, most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every tracked request.
    Info,
    /// Completed requests and lifecycle events.
    Log,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// The `tracing` filter level this verbosity corresponds to.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Info => "debug",
            LogLevel::Log => "info",
            LogLevel::Error => "warn",
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log verbosity.
    pub log_level: LogLevel,

    /// File the log sink appends to while the dashboard owns the terminal.
    pub log_file: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Log,
            log_file: "logs.txt".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Shutdown policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long in-flight connections may finish before being force-closed.
    /// Zero closes them immediately.
    pub drain_timeout_secs: u64,
}

impl ShutdownConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            port = 8080

            [destination]
            port = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.destination.authority(), "localhost:3000");
        assert_eq!(config.display.open_rows, 6);
        assert_eq!(config.display.refresh_millis, 1000);
        assert_eq!(config.observability.log_level, LogLevel::Log);
        assert_eq!(config.shutdown.drain_timeout_secs, 0);
        assert!(!config.destination.use_tls);
    }

    #[test]
    fn log_level_parses_lowercase() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [observability]
            log_level = "error"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_level, LogLevel::Error);
    }

    #[test]
    fn log_levels_are_ordered_by_verbosity() {
        assert!(LogLevel::Info < LogLevel::Log);
        assert!(LogLevel::Log < LogLevel::Error);
        assert_eq!(LogLevel::Info.as_filter(), "debug");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let destination = DestinationConfig {
            host: "::1".into(),
            port: 9000,
            use_tls: false,
        };
        assert_eq!(destination.authority(), "[::1]:9000");
    }
}
