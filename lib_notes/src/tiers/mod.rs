//! # Capability Interfaces
//!
//! The orchestrator talks to its collaborators only through these traits. Each
//! method is individually atomic in the backing service; composing them safely
//! is the job of `NamespaceStore`.
//!
//! - **`BufferTier`**: append-ordered list per namespace (Redis in production).
//! - **`DurableTier`**: batch insert and full scan per namespace (PostgreSQL).
//! - **`Broadcaster`**: best-effort publish to live subscribers.

use async_trait::async_trait;

use crate::errors::TierError;
use crate::record::Record;

/// In-memory tiers for tests and single-process deployments.
pub mod memory;

pub use memory::{MemoryBuffer, MemoryDurable};

/// Fast, volatile, append-ordered store.
#[async_trait]
pub trait BufferTier: Send + Sync {
    /// Appends one record to the end of the namespace's list.
    async fn append(&self, namespace: &str, record: &Record) -> Result<(), TierError>;

    /// Current number of buffered records.
    async fn length(&self, namespace: &str) -> Result<usize, TierError>;

    /// All buffered records in insertion order.
    async fn range_read(&self, namespace: &str) -> Result<Vec<Record>, TierError>;

    /// Removes every buffered record for the namespace.
    async fn clear(&self, namespace: &str) -> Result<(), TierError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Persistent archive, written only in whole-buffer batches.
#[async_trait]
pub trait DurableTier: Send + Sync {
    /// Inserts the batch atomically: either every record is committed or none is.
    async fn batch_insert(&self, namespace: &str, records: &[Record]) -> Result<(), TierError>;

    /// Every archived record in stored order.
    async fn scan_all(&self, namespace: &str) -> Result<Vec<Record>, TierError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Publish-to-all primitive.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn publish(&self, event: &str, record: &Record) -> Result<(), TierError>;
}
