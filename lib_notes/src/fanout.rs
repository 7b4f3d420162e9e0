//! # In-Process Fan-out
//!
//! `ChannelBroadcaster` implements `Broadcaster` over a Tokio broadcast channel.
//! Each connected subscriber (a WebSocket session, a test) holds its own
//! receiver; events are shared through `Arc` so a publish costs one allocation
//! regardless of how many clients are listening.
//!
//! Publishing with no subscribers is not a failure: there is simply nobody to
//! deliver to. Slow subscribers that fall more than `capacity` events behind
//! observe `RecvError::Lagged` on their side and skip ahead.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::errors::TierError;
use crate::record::Record;
use crate::tiers::Broadcaster;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Event pushed to subscribers: `{"event": "newTask", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub event: String,
    pub data: Record,
}

/// Tokio broadcast channel wrapped as a `Broadcaster`.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<Arc<BroadcastEvent>>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Registers a new subscriber. Only events published after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BroadcastEvent>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn publish(&self, event: &str, record: &Record) -> Result<(), TierError> {
        let frame = Arc::new(BroadcastEvent {
            event: event.to_string(),
            data: record.clone(),
        });
        match self.tx.send(frame) {
            Ok(delivered) => debug!(event, delivered, "event published"),
            Err(_) => debug!(event, "event published with no subscribers"),
        }
        Ok(())
    }
}
