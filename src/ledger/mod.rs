//! Request ledger subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder
//!     → track()    (request starts, id allocated, added to open set)
//!     → untrack()  (request ends, removed from open set, folded into stats)
//!
//! Dashboard
//!     → snapshot() (owned copy of both maps, never mutates)
//! ```

pub mod tracker;
pub mod types;

pub use tracker::Ledger;
pub use types::{
    LedgerError, LedgerSnapshot, OpenRequest, Outcome, PathStatistic, RequestId, UntrackedRequest,
};
