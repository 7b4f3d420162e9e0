use crate::notes_logic::config::{Backend, Settings};
use crate::notes_logic::state::AppState;
use anyhow::{Context, Result};
use lib_notes::connections::{PostgresDurable, RedisBuffer};
use lib_notes::{
    Broadcaster, BufferTier, ChannelBroadcaster, DurableTier, MemoryBuffer, MemoryDurable,
    NamespaceStore,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Connects the configured tiers and builds the single store shared by all handlers.
pub async fn build_state(settings: &Settings) -> Result<AppState> {
    let (buffer, durable) = connect_tiers(settings).await?;
    let fanout = ChannelBroadcaster::new(settings.broadcast_capacity);
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(fanout.clone());
    let store = NamespaceStore::new(settings.store.clone(), buffer, durable, broadcaster);
    Ok(AppState::new(Arc::new(store), fanout))
}

async fn connect_tiers(
    settings: &Settings,
) -> Result<(Arc<dyn BufferTier>, Arc<dyn DurableTier>)> {
    match settings.backend {
        Backend::Memory => {
            warn!("Using in-memory tiers; records are lost on restart.");
            Ok((Arc::new(MemoryBuffer::new()), Arc::new(MemoryDurable::new())))
        }
        Backend::External => {
            let redis_url = settings
                .redis_url
                .as_deref()
                .context("Redis URL missing for external backend")?;
            let database_url = settings
                .database_url
                .as_deref()
                .context("Database URL missing for external backend")?;

            let buffer = RedisBuffer::connect(redis_url)
                .await
                .context("Failed to connect to Redis")?;

            let durable =
                PostgresDurable::new(database_url, &settings.durable_table, settings.db_pool_size)
                    .context("Failed to create database pool")?;
            durable
                .ensure_schema()
                .await
                .context("Failed to prepare archive table")?;
            info!(table = %settings.durable_table, "Connected to Redis and PostgreSQL.");

            Ok((Arc::new(buffer), Arc::new(durable)))
        }
    }
}
