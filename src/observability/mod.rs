//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, file or stdout)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log file next to the dashboard
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
