//! # Namespace Store
//!
//! Ingest and read orchestration for one namespace.
//!
//! ## Ingest (`submit`)
//!
//! 1. Validate the text. Rejections touch no tier.
//! 2. Take the namespace lock.
//! 3. Stamp the record (never earlier than the previous one) and append it to
//!    the buffer tier.
//! 4. If the buffer length exceeds the threshold, compact: snapshot the whole
//!    buffer, batch insert it into the durable tier, and clear the buffer only
//!    if the insert committed.
//! 5. Queue the record on the broadcast relay and release the lock.
//!
//! Steps 3 to 5 are one critical section. A submit blocked on the lock is
//! applied either before a snapshot or after the matching clear, never in
//! between, and only the submit that pushed the length past the threshold
//! compacts.
//!
//! If the durable insert commits but the buffer clear fails, the submit reports
//! `BufferUnavailable` and the clear is retried at the start of the next
//! critical section, before anything else is appended or compacted.
//!
//! ## Read (`list_all`)
//!
//! Returns the buffer if it is non-empty, otherwise the durable archive. The two
//! tiers are never concatenated, so right after a compaction a reader sees the
//! archive and before it the buffer. Reads do not take the namespace lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::relay::Relay;
use super::stats::{StatsSnapshot, StoreStats};
use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};
use crate::record::{validate_text, validate_value, Record};
use crate::tiers::{Broadcaster, BufferTier, DurableTier};

/// Event name carried by every broadcast of a newly accepted record.
pub const NEW_RECORD_EVENT: &str = "newTask";

/// Observable lifecycle of a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "buffered", rename_all = "lowercase")]
pub enum NamespaceState {
    /// Buffer is empty.
    Empty,
    /// Buffer holds this many records.
    Buffering(usize),
    /// A compaction is running inside the critical section.
    Flushing,
}

/// Held under the namespace lock.
#[derive(Debug, Default)]
struct IngestState {
    last_created_at: Option<DateTime<Utc>>,
    // The durable tier committed a snapshot whose buffer clear then failed.
    // The buffer holds exactly that snapshot until the clear is retried.
    pending_clear: bool,
}

/// Owns the three capability handles for one namespace.
///
/// Built once at startup and shared (behind an `Arc`) with every transport
/// entry point.
pub struct NamespaceStore {
    config: StoreConfig,
    buffer: Arc<dyn BufferTier>,
    durable: Arc<dyn DurableTier>,
    ingest: Mutex<IngestState>,
    relay: Relay,
    flushing: AtomicBool,
    stats: Arc<StoreStats>,
}

impl NamespaceStore {
    /// Creates the store and spawns its broadcast relay task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: StoreConfig,
        buffer: Arc<dyn BufferTier>,
        durable: Arc<dyn DurableTier>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        let stats = Arc::new(StoreStats::default());
        let relay = Relay::spawn(broadcaster, NEW_RECORD_EVENT, Arc::clone(&stats));
        info!(
            namespace = config.namespace(),
            threshold = config.threshold(),
            buffer = buffer.name(),
            durable = durable.name(),
            "namespace store ready"
        );
        Self {
            config,
            buffer,
            durable,
            ingest: Mutex::new(IngestState::default()),
            relay,
            flushing: AtomicBool::new(false),
            stats,
        }
    }

    pub fn namespace(&self) -> &str {
        self.config.namespace()
    }

    pub fn threshold(&self) -> usize {
        self.config.threshold()
    }

    /// Accepts a typed text value.
    ///
    /// On `DurableWrite` the record has still been buffered and will be
    /// broadcast; only the compaction failed.
    pub async fn submit(&self, text: &str) -> StoreResult<Record> {
        let text = validate_text(text)?;
        self.ingest(text).await
    }

    /// Accepts a dynamically typed value, rejecting anything but a non-empty string.
    pub async fn submit_value(&self, value: &Value) -> StoreResult<Record> {
        let text = validate_value(value)?;
        self.ingest(text).await
    }

    async fn ingest(&self, text: &str) -> StoreResult<Record> {
        let namespace = self.config.namespace();
        let mut state = self.ingest.lock().await;
        self.finish_pending_clear(&mut state).await?;

        let record = Record::stamped(text, state.last_created_at);
        self.buffer
            .append(namespace, &record)
            .await
            .map_err(StoreError::BufferUnavailable)?;
        state.last_created_at = Some(record.created_at);
        self.stats.record_accepted();

        let compaction = self.compact_over_threshold(&mut state).await;
        if let Err(e) = &compaction {
            error!(namespace, error = %e, "compaction after submit failed");
        }

        self.relay.enqueue(record.clone());
        drop(state);

        compaction.map(|_| record)
    }

    /// Clears a buffer left over from a committed compaction. Until this
    /// succeeds nothing may be appended, or the next compaction would archive
    /// the committed records a second time.
    async fn finish_pending_clear(&self, state: &mut IngestState) -> StoreResult<()> {
        if !state.pending_clear {
            return Ok(());
        }
        let namespace = self.config.namespace();
        self.buffer
            .clear(namespace)
            .await
            .map_err(StoreError::BufferUnavailable)?;
        state.pending_clear = false;
        info!(namespace, "archived records cleared from buffer on retry");
        Ok(())
    }

    /// Compacts if the buffer has grown past the threshold. Caller holds the lock.
    async fn compact_over_threshold(
        &self,
        state: &mut IngestState,
    ) -> StoreResult<Option<usize>> {
        let length = self
            .buffer
            .length(self.config.namespace())
            .await
            .map_err(StoreError::BufferUnavailable)?;
        if length <= self.config.threshold() {
            return Ok(None);
        }
        debug!(namespace = self.config.namespace(), length, "threshold crossed");
        self.compact(state).await.map(Some)
    }

    /// Moves the whole buffer into the durable tier. Caller holds the lock.
    async fn compact(&self, state: &mut IngestState) -> StoreResult<usize> {
        self.flushing.store(true, Ordering::SeqCst);
        let result = self.move_snapshot(state).await;
        self.flushing.store(false, Ordering::SeqCst);
        result
    }

    async fn move_snapshot(&self, state: &mut IngestState) -> StoreResult<usize> {
        let namespace = self.config.namespace();
        let snapshot = self
            .buffer
            .range_read(namespace)
            .await
            .map_err(StoreError::BufferUnavailable)?;
        if snapshot.is_empty() {
            return Ok(0);
        }

        if let Err(source) = self.durable.batch_insert(namespace, &snapshot).await {
            self.stats.record_failed_compaction();
            return Err(StoreError::DurableWrite {
                namespace: namespace.to_string(),
                pending: snapshot.len(),
                source,
            });
        }

        // The batch is committed from here on, whatever the clear does.
        self.stats.record_compaction(snapshot.len());
        if let Err(e) = self.buffer.clear(namespace).await {
            state.pending_clear = true;
            error!(
                namespace,
                archived = snapshot.len(),
                error = %e,
                "buffer not cleared after durable commit, will retry before next append"
            );
            return Err(StoreError::BufferUnavailable(e));
        }

        info!(namespace, archived = snapshot.len(), "buffer compacted");
        Ok(snapshot.len())
    }

    /// Runs a compaction now regardless of the threshold. No-op on an empty buffer.
    pub async fn flush_now(&self) -> StoreResult<usize> {
        let mut state = self.ingest.lock().await;
        self.finish_pending_clear(&mut state).await?;
        let moved = self.compact(&mut state).await?;
        if moved == 0 {
            debug!(namespace = self.config.namespace(), "nothing to flush");
        }
        Ok(moved)
    }

    /// Current view of the namespace: the buffer if non-empty, else the archive.
    pub async fn list_all(&self) -> StoreResult<Vec<Record>> {
        let namespace = self.config.namespace();
        let buffered = self
            .buffer
            .range_read(namespace)
            .await
            .map_err(StoreError::BufferUnavailable)?;
        if !buffered.is_empty() {
            return Ok(buffered);
        }
        self.durable.scan_all(namespace).await.map_err(|e| {
            warn!(namespace, error = %e, "durable scan failed");
            StoreError::DurableRead(e)
        })
    }

    pub async fn state(&self) -> StoreResult<NamespaceState> {
        if self.flushing.load(Ordering::SeqCst) {
            return Ok(NamespaceState::Flushing);
        }
        let length = self
            .buffer
            .length(self.config.namespace())
            .await
            .map_err(StoreError::BufferUnavailable)?;
        Ok(match length {
            0 => NamespaceState::Empty,
            n => NamespaceState::Buffering(n),
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::ChannelBroadcaster;
    use crate::tiers::{MemoryBuffer, MemoryDurable};

    fn store_with(threshold: usize) -> (NamespaceStore, Arc<MemoryBuffer>, Arc<MemoryDurable>) {
        let buffer = Arc::new(MemoryBuffer::new());
        let durable = Arc::new(MemoryDurable::new());
        let store = NamespaceStore::new(
            StoreConfig::new("test-ns", threshold).unwrap(),
            buffer.clone(),
            durable.clone(),
            Arc::new(ChannelBroadcaster::default()),
        );
        (store, buffer, durable)
    }

    #[tokio::test]
    async fn test_submit_returns_exact_text() {
        let (store, _, _) = store_with(5);
        let record = store.submit("  spaced out  ").await.unwrap();
        assert_eq!(record.text, "  spaced out  ");
        assert_eq!(store.list_all().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_threshold_is_exclusive() {
        let (store, buffer, durable) = store_with(3);
        for i in 0..3 {
            store.submit(&format!("note {i}")).await.unwrap();
        }
        assert_eq!(buffer.length("test-ns").await.unwrap(), 3);
        assert_eq!(durable.insert_calls(), 0);
        assert_eq!(store.state().await.unwrap(), NamespaceState::Buffering(3));

        store.submit("note 3").await.unwrap();
        assert_eq!(buffer.length("test-ns").await.unwrap(), 0);
        assert_eq!(durable.scan_all("test-ns").await.unwrap().len(), 4);
        assert_eq!(store.state().await.unwrap(), NamespaceState::Empty);
    }

    #[tokio::test]
    async fn test_flush_now_moves_partial_buffer() {
        let (store, buffer, durable) = store_with(50);
        store.submit("a").await.unwrap();
        store.submit("b").await.unwrap();

        assert_eq!(store.flush_now().await.unwrap(), 2);
        assert_eq!(buffer.length("test-ns").await.unwrap(), 0);
        assert_eq!(durable.scan_all("test-ns").await.unwrap().len(), 2);

        assert_eq!(store.flush_now().await.unwrap(), 0);
        assert_eq!(durable.insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_buffer_rejects_without_durable_write() {
        let (store, buffer, durable) = store_with(1);
        buffer.set_unavailable(true);
        let err = store.submit("lost?").await.unwrap_err();
        assert!(matches!(err, StoreError::BufferUnavailable(_)));
        assert_eq!(durable.insert_calls(), 0);
        assert_eq!(store.stats().accepted, 0);
    }

    fn texts(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_failed_clear_is_retried_before_next_append() {
        let (store, buffer, durable) = store_with(2);
        store.submit("a").await.unwrap();
        store.submit("b").await.unwrap();

        buffer.fail_next_clears(1);
        let err = store.submit("c").await.unwrap_err();
        assert!(matches!(err, StoreError::BufferUnavailable(_)));
        assert_eq!(texts(&durable.scan_all("test-ns").await.unwrap()), ["a", "b", "c"]);

        store.submit("d").await.unwrap();
        assert_eq!(texts(&buffer.range_read("test-ns").await.unwrap()), ["d"]);

        store.submit("e").await.unwrap();
        store.submit("f").await.unwrap();
        assert_eq!(
            texts(&durable.scan_all("test-ns").await.unwrap()),
            ["a", "b", "c", "d", "e", "f"]
        );
        assert_eq!(buffer.length("test-ns").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_clear_retry_blocks_append() {
        let (store, buffer, durable) = store_with(1);
        buffer.fail_next_clears(2);
        store.submit("a").await.unwrap();
        assert!(store.submit("b").await.is_err());

        // Retry fails too: the submit is rejected and nothing is appended.
        let err = store.submit("c").await.unwrap_err();
        assert!(matches!(err, StoreError::BufferUnavailable(_)));
        assert_eq!(texts(&buffer.range_read("test-ns").await.unwrap()), ["a", "b"]);
        assert_eq!(store.stats().accepted, 2);

        // flush_now finishes the clear instead of archiving the snapshot again.
        assert_eq!(store.flush_now().await.unwrap(), 0);
        assert_eq!(buffer.length("test-ns").await.unwrap(), 0);
        assert_eq!(texts(&durable.scan_all("test-ns").await.unwrap()), ["a", "b"]);
        assert_eq!(durable.insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_state_serialises_for_health() {
        let value = serde_json::to_value(NamespaceState::Buffering(7)).unwrap();
        assert_eq!(value, serde_json::json!({"state": "buffering", "buffered": 7}));
        let value = serde_json::to_value(NamespaceState::Empty).unwrap();
        assert_eq!(value, serde_json::json!({"state": "empty"}));
    }
}
