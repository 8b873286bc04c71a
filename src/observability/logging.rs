//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Route logs to a file while the dashboard owns the terminal
//! - Map the configured verbosity onto tracing levels
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - The file writer is non-blocking; keep the returned guard alive so
//!   buffered lines are flushed on exit

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogLevel, ObservabilityConfig};

/// Filter directives for a verbosity level.
pub fn filter_directives(level: LogLevel) -> String {
    format!(
        "watch_proxy={},tower_http=warn,hyper=warn,hyper_util=warn",
        level.as_filter()
    )
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(level)))
}

/// Initialize logging.
///
/// With `to_file` set, lines are appended to the configured log file;
/// otherwise they go to stdout.
pub fn init(config: &ObservabilityConfig, to_file: bool) -> Option<WorkerGuard> {
    let filter = env_filter(config.log_level);

    if !to_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
            .init();
        return None;
    }

    let path = Path::new(&config.log_file);
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|f| f.to_os_string())
        .unwrap_or_else(|| "logs.txt".into());

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_follow_verbosity() {
        assert!(filter_directives(LogLevel::Info).starts_with("watch_proxy=debug"));
        assert!(filter_directives(LogLevel::Log).starts_with("watch_proxy=info"));
        assert!(filter_directives(LogLevel::Error).starts_with("watch_proxy=warn"));
    }

    #[test]
    fn directives_parse() {
        for level in [LogLevel::Info, LogLevel::Log, LogLevel::Error] {
            assert!(EnvFilter::try_new(filter_directives(level)).is_ok());
        }
    }
}
