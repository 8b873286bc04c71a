//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (command-line flags layered on top)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable for the run)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Args;
pub use loader::ConfigError;
pub use schema::{
    DestinationConfig, DisplayConfig, ListenerConfig, LogLevel, ObservabilityConfig, ProxyConfig,
    ShutdownConfig, TimeoutConfig,
};
