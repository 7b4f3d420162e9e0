//! Process-local buffer and durable tiers.
//!
//! Both keep one `Vec<Record>` per namespace behind a Tokio `RwLock`. They
//! carry switches for injecting faults (an unreachable buffer, failing clears,
//! a failing or slow durable insert) so the orchestrator's failure paths can be
//! exercised without external services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BufferTier, DurableTier};
use crate::errors::TierError;
use crate::record::Record;

/// In-memory `BufferTier`.
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    lists: RwLock<HashMap<String, Vec<Record>>>,
    unavailable: AtomicBool,
    failing_clears: AtomicUsize,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `TierError::Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next `count` calls to `clear` fail without removing anything.
    pub fn fail_next_clears(&self, count: usize) {
        self.failing_clears.store(count, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TierError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TierError::Unavailable("memory buffer switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BufferTier for MemoryBuffer {
    async fn append(&self, namespace: &str, record: &Record) -> Result<(), TierError> {
        self.check()?;
        let mut lists = self.lists.write().await;
        lists
            .entry(namespace.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn length(&self, namespace: &str) -> Result<usize, TierError> {
        self.check()?;
        let lists = self.lists.read().await;
        Ok(lists.get(namespace).map_or(0, Vec::len))
    }

    async fn range_read(&self, namespace: &str) -> Result<Vec<Record>, TierError> {
        self.check()?;
        let lists = self.lists.read().await;
        Ok(lists.get(namespace).cloned().unwrap_or_default())
    }

    async fn clear(&self, namespace: &str) -> Result<(), TierError> {
        self.check()?;
        let consumed = self
            .failing_clears
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(TierError::Unavailable("memory buffer clear switched off".to_string()));
        }
        self.lists.write().await.remove(namespace);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// In-memory `DurableTier`.
#[derive(Debug, Default)]
pub struct MemoryDurable {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    fail_inserts: AtomicBool,
    insert_delay: Option<Duration>,
    insert_calls: AtomicUsize,
}

impl MemoryDurable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch insert sleeps for `delay` before committing, widening the
    /// window in which concurrent submits queue behind a compaction.
    pub fn with_insert_delay(delay: Duration) -> Self {
        Self {
            insert_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Makes batch inserts fail (without committing anything) until reset.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of batch inserts attempted, successful or not.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableTier for MemoryDurable {
    async fn batch_insert(&self, namespace: &str, records: &[Record]) -> Result<(), TierError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(TierError::Operation("injected batch insert failure".to_string()));
        }
        let mut collections = self.collections.write().await;
        collections
            .entry(namespace.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    async fn scan_all(&self, namespace: &str) -> Result<Vec<Record>, TierError> {
        let collections = self.collections.read().await;
        Ok(collections.get(namespace).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffer_keeps_insertion_order_per_namespace() {
        let buffer = MemoryBuffer::new();
        buffer.append("a", &Record::stamped("one", None)).await.unwrap();
        buffer.append("a", &Record::stamped("two", None)).await.unwrap();
        buffer.append("b", &Record::stamped("other", None)).await.unwrap();

        let texts: Vec<_> = buffer
            .range_read("a")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(buffer.length("b").await.unwrap(), 1);

        buffer.clear("a").await.unwrap();
        assert_eq!(buffer.length("a").await.unwrap(), 0);
        assert_eq!(buffer.length("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_buffer_unavailable() {
        let buffer = MemoryBuffer::new();
        buffer.set_unavailable(true);
        let err = buffer.length("a").await.unwrap_err();
        assert!(matches!(err, TierError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_failed_insert_commits_nothing() {
        let durable = MemoryDurable::new();
        durable.set_fail_inserts(true);
        let batch = vec![Record::stamped("x", None)];
        assert!(durable.batch_insert("a", &batch).await.is_err());
        assert!(durable.scan_all("a").await.unwrap().is_empty());
        assert_eq!(durable.insert_calls(), 1);

        durable.set_fail_inserts(false);
        durable.batch_insert("a", &batch).await.unwrap();
        assert_eq!(durable.scan_all("a").await.unwrap(), batch);
    }
}
