use lib_notes::fanout::BroadcastEvent;
use lib_notes::{ChannelBroadcaster, NamespaceStore};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared by every handler. Cloning copies two handles.
#[derive(Clone)]
pub struct AppState {
    // Ingest and read entry points for the configured namespace
    pub store: Arc<NamespaceStore>,
    // Live subscriber fan-out; the store publishes into it through its relay
    fanout: ChannelBroadcaster,
}

impl AppState {
    pub fn new(store: Arc<NamespaceStore>, fanout: ChannelBroadcaster) -> Self {
        Self { store, fanout }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BroadcastEvent>> {
        self.fanout.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.fanout.subscriber_count()
    }
}
