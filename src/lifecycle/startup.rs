//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (signals, metrics, dashboard)
//! - Bind the listener and begin accepting traffic
//! - Wait for every task to finish before reporting shutdown complete
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every task subscribes to `Shutdown` before anything can trigger it

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::display::{FrameSettings, Renderer, Terminal};
use crate::http::HttpServer;
use crate::ledger::Ledger;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

/// Errors that stop the proxy from starting or running.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("terminal error: {0}")]
    Terminal(#[source] std::io::Error),

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Run the proxy until a shutdown signal arrives.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let display_shutdown = shutdown.subscribe();
    let signal_task = signals::spawn_signal_listener(shutdown.clone());

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    if config.destination.use_tls {
        tracing::warn!("TLS was requested but is not implemented; forwarding over plain HTTP");
    }

    let listener = Listener::bind(&config.listener).await?;
    let listen = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| config.listener.bind_address());

    let ledger = Ledger::new();

    let dashboard = if config.display.enabled {
        let terminal = Terminal::stdout().map_err(StartupError::Terminal)?;
        let settings = FrameSettings {
            listen,
            destination: config.destination.authority(),
            open_rows: config.display.open_rows,
            slow_after: config.display.slow_after(),
        };
        let renderer = Renderer::new(ledger.clone(), terminal, settings, config.display.refresh_interval());
        Some(tokio::spawn(renderer.run(display_shutdown)))
    } else {
        drop(display_shutdown);
        None
    };

    tracing::info!(
        listen = %config.listener.bind_address(),
        destination = %config.destination.authority(),
        "Proxy starting"
    );

    let server = HttpServer::new(config, ledger);
    let result = server.run(listener, server_shutdown).await;

    // Also stops the dashboard when the server exited on its own.
    shutdown.trigger();
    signal_task.abort();
    if let Some(dashboard) = dashboard {
        if let Err(e) = dashboard.await {
            tracing::error!(error = %e, "Dashboard task failed");
        }
    }

    tracing::info!("Shutdown complete");
    result.map_err(StartupError::Server)
}
