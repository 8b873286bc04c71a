//! Ledger data types.

use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

/// Identifier assigned to a tracked request.
///
/// Allocated from 1 upwards and never reused within a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// A request that has been tracked but not yet untracked.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub id: RequestId,
    /// HTTP method, for display only.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Monotonic start time, used for durations.
    pub started_at: Instant,
    /// Wall-clock start time.
    pub started_wall: SystemTime,
}

/// Running statistics for one request path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStatistic {
    pub path: String,
    /// Number of completed requests for this path.
    pub call_count: u64,
    /// Wall-clock start of the most recently completed request.
    pub last_call_started_at: SystemTime,
    /// Arithmetic mean of every completed duration, in milliseconds.
    pub average_response_millis: f64,
    /// Completed requests that closed on an error path.
    pub failure_count: u64,
}

impl PathStatistic {
    pub(crate) fn empty(path: &str, started_wall: SystemTime) -> Self {
        Self {
            path: path.to_string(),
            call_count: 0,
            last_call_started_at: started_wall,
            average_response_millis: 0.0,
            failure_count: 0,
        }
    }

    /// Fold one completed duration into the running mean.
    pub(crate) fn record(&mut self, duration_millis: f64, started_wall: SystemTime, outcome: Outcome) {
        let prior = self.call_count as f64;
        self.average_response_millis = if self.call_count == 0 {
            duration_millis
        } else {
            (self.average_response_millis * prior + duration_millis) / (prior + 1.0)
        };
        self.call_count += 1;
        self.last_call_started_at = started_wall;
        if outcome == Outcome::Failed {
            self.failure_count += 1;
        }
    }
}

/// How a tracked request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

/// Result of a successful `untrack`.
#[derive(Debug, Clone, PartialEq)]
pub struct UntrackedRequest {
    pub id: RequestId,
    pub path: String,
    pub duration: Duration,
    pub outcome: Outcome,
}

/// Owned copy of the ledger state at one instant.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub open: Vec<OpenRequest>,
    pub stats: Vec<PathStatistic>,
}

/// Errors reported by the ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// `untrack` was called with an id that is not open.
    #[error("unknown tracking id {0}")]
    UnknownTrackingId(RequestId),
}
