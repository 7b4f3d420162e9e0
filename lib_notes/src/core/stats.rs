//! # Store Counters
//!
//! Plain `AtomicU64` counters updated from the ingest path and the relay task
//! without taking any lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(crate) struct StoreStats {
    accepted: AtomicU64,
    compactions: AtomicU64,
    failed_compactions: AtomicU64,
    archived: AtomicU64,
    broadcast_failures: AtomicU64,
}

impl StoreStats {
    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compaction(&self, archived: usize) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
        self.archived.fetch_add(archived as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_compaction(&self) {
        self.failed_compactions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast_failure(&self) {
        self.broadcast_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
            failed_compactions: self.failed_compactions.load(Ordering::Relaxed),
            archived: self.archived.load(Ordering::Relaxed),
            broadcast_failures: self.broadcast_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the store counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Records appended to the buffer tier.
    pub accepted: u64,
    /// Compactions committed to the durable tier.
    pub compactions: u64,
    /// Compactions whose durable batch insert failed.
    pub failed_compactions: u64,
    /// Records moved to the durable tier.
    pub archived: u64,
    /// Records the broadcaster failed to publish.
    pub broadcast_failures: u64,
}
