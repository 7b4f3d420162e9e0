//! # Broadcast Relay
//!
//! An unbounded MPSC queue drained by one task. The ingest path pushes each
//! stored record while it still holds the namespace lock, which fixes the
//! delivery order to the storage order; the task then publishes outside the
//! lock. Publish failures are logged and counted, never reported to the
//! submitter. The task ends when the store (the only sender) is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::stats::StoreStats;
use crate::errors::StoreError;
use crate::record::Record;
use crate::tiers::Broadcaster;

pub(crate) struct Relay {
    tx: mpsc::UnboundedSender<Record>,
    _task: JoinHandle<()>,
}

impl Relay {
    /// Spawns the delivery task on the current Tokio runtime.
    pub(crate) fn spawn(
        broadcaster: Arc<dyn Broadcaster>,
        event: &'static str,
        stats: Arc<StoreStats>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Record>();
        let task = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = broadcaster.publish(event, &record).await {
                    stats.record_broadcast_failure();
                    let err = StoreError::Broadcast(e);
                    warn!(error = %err, text_len = record.text.len(), "dropping broadcast");
                }
            }
            debug!("broadcast relay stopped");
        });
        Self { tx, _task: task }
    }

    /// Queues a record for delivery. Never blocks.
    pub(crate) fn enqueue(&self, record: Record) {
        if self.tx.send(record).is_err() {
            warn!("broadcast relay is gone, record will not be broadcast");
        }
    }
}
