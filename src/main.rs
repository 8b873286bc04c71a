//! watch-proxy
//!
//! Forwards every request to one upstream and shows what is in flight.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────┐
//!                  │                   WATCH PROXY                     │
//!                  │                                                   │
//!  Client Request  │  ┌────────┐   ┌─────────┐   ┌────────────────┐   │
//!  ────────────────┼─▶│  net   │──▶│  http   │──▶│ forward        │───┼──▶ Upstream
//!                  │  │listener│   │ server  │   │ (one outbound  │   │
//!  ◀───────────────┼──│        │◀──│         │◀──│  per request)  │◀──┼───
//!  Client Response │  └────────┘   └─────────┘   └───────┬────────┘   │
//!                  │                          track/untrack│           │
//!                  │                                       ▼           │
//!                  │  ┌───────────┐   snapshot   ┌────────────────┐    │
//!                  │  │ display   │◀─────────────│    ledger      │    │
//!                  │  │ renderer  │  (read only) │ open + stats   │    │
//!                  │  └───────────┘              └────────────────┘    │
//!                  │                                                   │
//!                  │  config · lifecycle (signals/shutdown) · logging  │
//!                  └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::process::ExitCode;

use watch_proxy::config::Args;
use watch_proxy::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid Usage: {}", e);
            eprintln!("\n  {}\n", Args::usage());
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = logging::init(&config.observability, config.display.enabled);

    tracing::info!("watch-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    match watch_proxy::lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Proxy stopped with an error");
            eprintln!("watch-proxy: {}", e);
            ExitCode::FAILURE
        }
    }
}
