//! # Core Orchestration Module
//!
//! This module ties the buffer tier, the durable tier and the broadcast channel
//! into one consistent sequence per namespace.
//!
//! ## Core Components:
//!
//! - **`store`**: `NamespaceStore`, exposing `submit` (ingest), `list_all`
//!   (read) and `flush_now`. Ingest runs append, threshold check, snapshot,
//!   durable batch insert and clear as a single critical section per namespace,
//!   so no record can land between the snapshot and the clear and no two
//!   submits can compact the same data.
//!
//! - **`relay`**: the outbox between the critical section and the broadcaster.
//!   Records are enqueued in stored order while the ingest lock is held and
//!   delivered by a background task, so a slow or failing subscriber channel
//!   never holds up ingest.
//!
//! - **`stats`**: lock-free counters reported by the health endpoint.

/// The ingest and read orchestrator.
pub mod store;
/// Ordered hand-off from the critical section to the broadcaster.
pub mod relay;
/// Atomic counters.
pub mod stats;

// --- Public API Re-exports ---
pub use stats::StatsSnapshot;
pub use store::{NamespaceState, NamespaceStore, NEW_RECORD_EVENT};
