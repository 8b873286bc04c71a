//! HTTP server setup and connection handling.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Serve HTTP/1.1 and HTTP/2 on each accepted connection
//! - Wire up middleware (tracing)
//! - Stop accepting on shutdown, then drain or force-close connections

use axum::{body::Body, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::forward::proxy_handler;
use crate::ledger::Ledger;
use crate::net::{ConnectionTracker, Listener, ListenerError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub client: Client<HttpConnector, Body>,
    /// Upstream authority, `host:port`.
    pub destination: Arc<str>,
    pub response_timeout: Duration,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server recording into `ledger`.
    pub fn new(config: ProxyConfig, ledger: Ledger) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.timeouts.connect()));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            ledger,
            client,
            destination: Arc::from(config.destination.authority()),
            response_timeout: config.timeouts.response(),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, accepting on `listener`.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            destination = %self.config.destination.authority(),
            "HTTP server starting"
        );

        let tracker = ConnectionTracker::new();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        let guard = tracker.track(peer_addr);
                        let service = TowerToHyperService::new(self.router.clone());
                        connections.spawn(async move {
                            let _permit = permit;
                            let io = TokioIo::new(stream);
                            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                                .serve_connection(io, service)
                                .await
                            {
                                tracing::debug!(
                                    connection_id = %guard.id(),
                                    peer_addr = %guard.peer(),
                                    error = %e,
                                    "Connection ended with error"
                                );
                            }
                        });
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Connection task panicked");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        close_connections(connections, &tracker, self.config.shutdown.drain_timeout()).await;

        tracing::info!(peak_connections = tracker.peak_count(), "HTTP server stopped");
        Ok(())
    }
}

/// Give connections up to `drain` to finish, then abort whatever is left.
///
/// Aborting a connection drops its in-flight requests, which untracks them.
async fn close_connections(mut connections: JoinSet<()>, tracker: &ConnectionTracker, drain: Duration) {
    if !drain.is_zero() && !connections.is_empty() {
        tracing::info!(
            open_connections = tracker.active_count(),
            drain_timeout = ?drain,
            "Draining connections"
        );
        let drained = tokio::time::timeout(drain, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_ok() {
            return;
        }
    }

    if !connections.is_empty() {
        tracing::info!(open_connections = tracker.active_count(), "Force-closing connections");
    }
    connections.shutdown().await;
}
