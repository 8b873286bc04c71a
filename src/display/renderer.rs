//! Periodic dashboard repaint.
//!
//! # Design Decisions
//! - One snapshot per tick; the ledger is only read
//! - A failed repaint is logged and retried on the next tick
//! - The screen is restored when the loop ends, whatever ended it

use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use super::layout::{build_frame, FrameSettings};
use super::terminal::Screen;
use crate::ledger::{Ledger, LedgerSnapshot};

/// Source of the state to paint.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> LedgerSnapshot;
}

impl SnapshotSource for Ledger {
    fn snapshot(&self) -> LedgerSnapshot {
        Ledger::snapshot(self)
    }
}

/// Repaints the dashboard on a fixed interval until shutdown.
pub struct Renderer<S: SnapshotSource, T: Screen> {
    source: S,
    screen: T,
    settings: FrameSettings,
    interval: Duration,
}

impl<S: SnapshotSource, T: Screen> Renderer<S, T> {
    pub fn new(source: S, screen: T, settings: FrameSettings, interval: Duration) -> Self {
        Self {
            source,
            screen,
            settings,
            interval,
        }
    }

    /// Run until `shutdown` fires (or its sender is dropped), then restore
    /// the screen. Returns the screen so callers can inspect or reuse it.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> T {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Dashboard starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.repaint() {
                        tracing::warn!(error = %e, "Dashboard repaint failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Dashboard received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        if let Err(e) = self.screen.restore() {
            tracing::error!(error = %e, "Failed to restore terminal");
        }
        self.screen
    }

    /// Paint one frame from a fresh snapshot.
    pub fn repaint(&mut self) -> std::io::Result<()> {
        let dims = self.screen.size()?;
        let snapshot = self.source.snapshot();
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let frame = build_frame(&snapshot, &self.settings, dims, Instant::now(), &timestamp);
        self.screen.draw(&frame)
    }
}
