//! The request ledger.
//!
//! # Responsibilities
//! - Allocate request IDs
//! - Hold the open-request set
//! - Fold completed requests into per-path statistics
//! - Hand out consistent snapshots to the dashboard
//!
//! # Design Decisions
//! - Both maps live behind one mutex; `track`, `untrack` and `snapshot`
//!   are each a single critical section
//! - The lock is never held across an await point

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Instant, SystemTime};

use super::types::{
    LedgerError, LedgerSnapshot, OpenRequest, Outcome, PathStatistic, RequestId, UntrackedRequest,
};

#[derive(Debug)]
struct LedgerState {
    next_id: u64,
    open: HashMap<RequestId, OpenRequest>,
    stats: HashMap<String, PathStatistic>,
}

/// Shared ledger of in-flight requests and per-path statistics.
///
/// Cloning is cheap; all clones refer to the same state.
#[derive(Debug, Clone)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
}

impl Ledger {
    /// Create an empty ledger. The first tracked request gets id 1.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                next_id: 1,
                open: HashMap::new(),
                stats: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Every critical section leaves the maps consistent, so a poisoned
        // lock still guards valid data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a request for `path`.
    pub fn track(&self, method: &str, path: &str) -> RequestId {
        self.track_at(method, path, Instant::now())
    }

    /// Start tracking a request that began at `started_at`.
    pub fn track_at(&self, method: &str, path: &str, started_at: Instant) -> RequestId {
        let started_wall = SystemTime::now()
            .checked_sub(Instant::now().saturating_duration_since(started_at))
            .unwrap_or_else(SystemTime::now);
        let id = {
            let mut state = self.lock();
            let id = RequestId::new(state.next_id);
            state.next_id += 1;
            state.open.insert(
                id,
                OpenRequest {
                    id,
                    method: method.to_string(),
                    path: path.to_string(),
                    started_at,
                    started_wall,
                },
            );
            id
        };

        tracing::debug!(request_id = %id, method = %method, path = %path, "Tracking request");
        id
    }

    /// Stop tracking a request that completed successfully.
    pub fn untrack(&self, id: RequestId) -> Result<UntrackedRequest, LedgerError> {
        self.untrack_at(id, Outcome::Succeeded, Instant::now())
    }

    /// Stop tracking a request, recording how it ended.
    pub fn untrack_with(&self, id: RequestId, outcome: Outcome) -> Result<UntrackedRequest, LedgerError> {
        self.untrack_at(id, outcome, Instant::now())
    }

    /// Stop tracking a request that ended at `ended_at`.
    ///
    /// Removing the open entry and updating the path statistic happen under
    /// one lock acquisition, so no snapshot sees one without the other.
    pub fn untrack_at(
        &self,
        id: RequestId,
        outcome: Outcome,
        ended_at: Instant,
    ) -> Result<UntrackedRequest, LedgerError> {
        let result = {
            let mut state = self.lock();
            match state.open.remove(&id) {
                None => Err(LedgerError::UnknownTrackingId(id)),
                Some(request) => {
                    let duration = ended_at.saturating_duration_since(request.started_at);
                    let millis = duration.as_secs_f64() * 1000.0;
                    state
                        .stats
                        .entry(request.path.clone())
                        .or_insert_with(|| PathStatistic::empty(&request.path, request.started_wall))
                        .record(millis, request.started_wall, outcome);
                    Ok(UntrackedRequest {
                        id,
                        path: request.path,
                        duration,
                        outcome,
                    })
                }
            }
        };

        match &result {
            Ok(done) if done.outcome == Outcome::Succeeded => tracing::info!(
                request_id = %id,
                path = %done.path,
                duration_ms = done.duration.as_millis() as u64,
                "Untracking request"
            ),
            Ok(done) => tracing::warn!(
                request_id = %id,
                path = %done.path,
                duration_ms = done.duration.as_millis() as u64,
                "Untracking failed request"
            ),
            Err(e) => tracing::error!(request_id = %id, error = %e, "Could not untrack request"),
        }
        result
    }

    /// Take an owned, consistent copy of the open set and the statistics.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.lock();
        LedgerSnapshot {
            open: state.open.values().cloned().collect(),
            stats: state.stats.values().cloned().collect(),
        }
    }

    /// Number of requests currently open.
    pub fn open_count(&self) -> usize {
        self.lock().open.len()
    }

    /// Statistic for a single path, if any request for it has completed.
    pub fn statistic(&self, path: &str) -> Option<PathStatistic> {
        self.lock().stats.get(path).cloned()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ledger = Ledger::new();
        let first = ledger.track("GET", "/a");
        assert_eq!(first.as_u64(), 1);

        let mut previous = first;
        for _ in 0..50 {
            let next = ledger.track("GET", "/a");
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn ids_are_not_reused_after_untrack() {
        let ledger = Ledger::new();
        let a = ledger.track("GET", "/a");
        ledger.untrack(a).unwrap();
        let b = ledger.track("GET", "/a");
        assert_ne!(a, b);
        assert_eq!(b.as_u64(), 2);
    }

    #[test]
    fn second_untrack_is_reported_and_changes_nothing() {
        let ledger = Ledger::new();
        let id = ledger.track("GET", "/once");
        ledger.untrack(id).unwrap();
        let before = ledger.statistic("/once").unwrap();

        assert_eq!(ledger.untrack(id), Err(LedgerError::UnknownTrackingId(id)));
        assert_eq!(ledger.statistic("/once").unwrap(), before);
        assert_eq!(ledger.open_count(), 0);
    }

    #[test]
    fn unknown_id_on_fresh_ledger() {
        let ledger = Ledger::new();
        let bogus = RequestId::new(42);
        assert_eq!(ledger.untrack(bogus), Err(LedgerError::UnknownTrackingId(bogus)));
        assert!(ledger.snapshot().stats.is_empty());
    }

    #[test]
    fn average_is_mean_of_durations() {
        let ledger = Ledger::new();
        let base = Instant::now();
        let durations = [120u64, 30, 75, 400, 5];

        for (i, d) in durations.iter().enumerate() {
            let start = base + Duration::from_secs(i as u64);
            let id = ledger.track_at("GET", "/mean", start);
            ledger
                .untrack_at(id, Outcome::Succeeded, start + Duration::from_millis(*d))
                .unwrap();
        }

        let stat = ledger.statistic("/mean").unwrap();
        let expected = durations.iter().sum::<u64>() as f64 / durations.len() as f64;
        assert_eq!(stat.call_count, durations.len() as u64);
        assert!((stat.average_response_millis - expected).abs() < 1e-6);
        assert_eq!(stat.failure_count, 0);
    }

    #[test]
    fn failures_are_counted_and_averaged() {
        let ledger = Ledger::new();
        let base = Instant::now();

        let ok = ledger.track_at("GET", "/mixed", base);
        ledger.untrack_at(ok, Outcome::Succeeded, base + Duration::from_millis(10)).unwrap();
        let bad = ledger.track_at("GET", "/mixed", base);
        ledger.untrack_at(bad, Outcome::Failed, base + Duration::from_millis(30)).unwrap();

        let stat = ledger.statistic("/mixed").unwrap();
        assert_eq!(stat.call_count, 2);
        assert_eq!(stat.failure_count, 1);
        assert!((stat.average_response_millis - 20.0).abs() < 1e-6);
    }

    #[test]
    fn statistics_are_kept_per_path() {
        let ledger = Ledger::new();
        for path in ["/a", "/b", "/a"] {
            let id = ledger.track("GET", path);
            ledger.untrack(id).unwrap();
        }

        assert_eq!(ledger.statistic("/a").unwrap().call_count, 2);
        assert_eq!(ledger.statistic("/b").unwrap().call_count, 1);
        assert!(ledger.statistic("/c").is_none());
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let ledger = Ledger::new();
        let id = ledger.track("POST", "/upload");
        let snapshot = ledger.snapshot();

        ledger.untrack(id).unwrap();

        assert_eq!(snapshot.open.len(), 1);
        assert_eq!(snapshot.open[0].method, "POST");
        assert!(snapshot.stats.is_empty());
        assert_eq!(ledger.open_count(), 0);
    }

    #[test]
    fn snapshot_never_sees_request_both_open_and_completed() {
        let ledger = Ledger::new();
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        // Every path is used exactly once.
                        let id = ledger.track("GET", &format!("/w{w}/r{i}"));
                        ledger.untrack(id).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let ledger = ledger.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                    let snapshot = ledger.snapshot();
                    let completed: HashSet<_> = snapshot.stats.iter().map(|s| s.path.clone()).collect();
                    for open in &snapshot.open {
                        assert!(!completed.contains(&open.path), "{} both open and completed", open.path);
                    }
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        reader.join().unwrap();

        let snapshot = ledger.snapshot();
        assert!(snapshot.open.is_empty());
        assert_eq!(snapshot.stats.len(), 2000);
    }
}
