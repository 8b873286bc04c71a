//! Single-destination reverse proxy with a live terminal dashboard.

pub mod config;
pub mod display;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use ledger::Ledger;
pub use lifecycle::Shutdown;
