//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports set, intervals > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a listen port is required")]
    MissingListenPort,

    #[error("a destination port is required")]
    MissingDestinationPort,

    #[error("destination host must not be empty")]
    EmptyDestinationHost,

    #[error("refresh interval must be greater than zero")]
    ZeroRefreshInterval,

    #[error("at least one ongoing-request row is required")]
    ZeroOpenRows,

    #[error("response timeout must be greater than zero")]
    ZeroResponseTimeout,

    #[error("max_connections must be greater than zero when set")]
    ZeroMaxConnections,

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::MissingListenPort);
    }
    if config.listener.max_connections == Some(0) {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.destination.port == 0 {
        errors.push(ValidationError::MissingDestinationPort);
    }
    if config.destination.host.trim().is_empty() {
        errors.push(ValidationError::EmptyDestinationHost);
    }
    if config.timeouts.response_secs == 0 {
        errors.push(ValidationError::ZeroResponseTimeout);
    }
    if config.display.refresh_millis == 0 {
        errors.push(ValidationError::ZeroRefreshInterval);
    }
    if config.display.open_rows == 0 {
        errors.push(ValidationError::ZeroOpenRows);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
