//! Client connection bookkeeping.
//!
//! Every accepted socket gets a `ConnectionGuard` for as long as its
//! connection task runs. The tracker counts them so shutdown can log how
//! many connections it is draining or force-closing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Identifier for one accepted connection, unique per tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Counters {
    next_id: AtomicU64,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Live connection counts for one server.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    counters: Arc<Counters>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection from `peer`. It stays counted until the guard drops.
    pub fn track(&self, peer: SocketAddr) -> ConnectionGuard {
        let id = ConnectionId(self.counters.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let active = self.counters.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.peak.fetch_max(active, Ordering::AcqRel);

        tracing::trace!(connection_id = %id, peer_addr = %peer, active, "Connection opened");
        ConnectionGuard {
            counters: Arc::clone(&self.counters),
            id,
            peer,
        }
    }

    /// Connections whose guard is still alive.
    pub fn active_count(&self) -> usize {
        self.counters.active.load(Ordering::Acquire)
    }

    /// Highest number of simultaneous connections seen.
    pub fn peak_count(&self) -> usize {
        self.counters.peak.load(Ordering::Acquire)
    }
}

/// Held by a connection task for its whole lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    counters: Arc<Counters>,
    id: ConnectionId,
    peer: SocketAddr,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(connection_id = %self.id, peer_addr = %self.peer, "Connection closed");
    }
}
