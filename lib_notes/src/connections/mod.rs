//! # Connections Module
//!
//! Production implementations of the tier capabilities backed by external
//! services.

/// Redis list per namespace as the buffer tier.
pub mod cache_redis;

/// PostgreSQL table as the durable tier.
pub mod db_postgres;

pub use cache_redis::{redis_url_from_parts, RedisBuffer};
pub use db_postgres::PostgresDurable;
