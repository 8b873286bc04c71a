//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, Axum router)
//!     → forward.rs (track, rebase URI, send upstream)
//!     → lifecycle.rs (phase transitions, untrack on every exit)
//!     → response.rs (gateway errors) or streamed upstream response
//!     → Send to client
//! ```

pub mod forward;
pub mod lifecycle;
pub mod response;
pub mod server;

pub use forward::ForwardError;
pub use lifecycle::{CloseReason, RequestPhase, TrackedRequest};
pub use server::{AppState, HttpServer};
