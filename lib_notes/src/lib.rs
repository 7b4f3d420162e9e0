//! # lib_notes
//!
//! Core library for the tiered note ingest service. Producers submit short text
//! records; each record is appended to a fast buffer tier, the buffer is
//! compacted into a durable tier once it grows past a threshold, and every
//! accepted record is fanned out to live subscribers.
//!
//! ## Modules:
//!
//! - **`record`**: the `Record` value and input validation.
//! - **`errors`**: `StoreError` (caller-facing) and `TierError` (capability-facing).
//! - **`config`**: namespace and compaction threshold.
//! - **`tiers`**: capability traits for the buffer, durable and broadcast
//!   collaborators, plus in-memory implementations.
//! - **`fanout`**: in-process broadcaster backed by a Tokio broadcast channel.
//! - **`core`**: `NamespaceStore`, the ingest and read orchestrator.
//! - **`connections`** (feature `connections`): Redis buffer tier and PostgreSQL
//!   durable tier.
//! - **`loggers`** (feature `loggers`): tracing subscriber setup.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod core;
pub mod errors;
pub mod fanout;
pub mod record;
pub mod tiers;

#[cfg(feature = "connections")]
pub mod connections;

#[cfg(feature = "loggers")]
pub mod loggers;

// --- Public API Re-exports ---
pub use config::{StoreConfig, DEFAULT_THRESHOLD};
pub use crate::core::{NamespaceState, NamespaceStore, StatsSnapshot, NEW_RECORD_EVENT};
pub use errors::{StoreError, StoreResult, TierError};
pub use fanout::{BroadcastEvent, ChannelBroadcaster};
pub use record::Record;
pub use tiers::{Broadcaster, BufferTier, DurableTier, MemoryBuffer, MemoryDurable};
