//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Subscribe tasks → Bind listener → Start dashboard → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close connections
//!     → Dashboard restores terminal → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, close, restore terminal
//! - In-flight connections are force-closed unless a drain timeout is set

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, StartupError};
