//! # Error Types
//!
//! `TierError` is what a capability (buffer, durable, broadcast) reports.
//! `StoreError` is what callers of the orchestrator see; it records which step
//! failed so the transport layer can pick a status code.

use thiserror::Error;

/// Result type for orchestrator operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a tier or broadcast implementation.
#[derive(Debug, Clone, Error)]
pub enum TierError {
    /// The backing service could not be reached.
    #[error("tier unavailable: {0}")]
    Unavailable(String),

    /// The backing service was reached but rejected or failed the command.
    #[error("tier operation failed: {0}")]
    Operation(String),

    /// A stored entry could not be decoded into a record.
    #[error("corrupt entry: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for TierError {
    fn from(e: serde_json::Error) -> Self {
        TierError::Decode(e.to_string())
    }
}

/// Caller-facing errors of the ingest and read orchestrators.
#[derive(Debug, Error)]
pub enum StoreError {
    // ==================
    // Input Errors
    // ==================
    /// Text missing, not a string, or empty. Nothing was written.
    #[error("invalid record text: {0}")]
    Validation(String),

    // ==================
    // Tier Errors
    // ==================
    /// Compaction could not commit to the durable tier. The buffer is unchanged
    /// and the submitted record remains buffered.
    #[error("durable write failed for namespace '{namespace}' ({pending} records kept in buffer): {source}")]
    DurableWrite {
        /// Namespace whose compaction failed.
        namespace: String,
        /// Number of records still held by the buffer tier.
        pending: usize,
        /// Underlying tier failure.
        #[source]
        source: TierError,
    },

    /// The buffer tier could not be reached.
    #[error("buffer tier unavailable: {0}")]
    BufferUnavailable(#[source] TierError),

    /// The durable tier scan failed while serving a read.
    #[error("durable tier read failed: {0}")]
    DurableRead(#[source] TierError),

    /// Delivery to subscribers failed. Logged by the relay, never returned by `submit`.
    #[error("broadcast failed: {0}")]
    Broadcast(#[source] TierError),

    // ==================
    // Setup Errors
    // ==================
    /// Invalid namespace or threshold.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Short machine-readable name, used in transport error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "ValidationError",
            StoreError::DurableWrite { .. } => "DurableWriteError",
            StoreError::BufferUnavailable(_) => "BufferUnavailable",
            StoreError::DurableRead(_) => "DurableReadError",
            StoreError::Broadcast(_) => "BroadcastError",
            StoreError::Config(_) => "ConfigError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durable_write_message_mentions_pending() {
        let err = StoreError::DurableWrite {
            namespace: "notes".to_string(),
            pending: 51,
            source: TierError::Unavailable("connection refused".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("notes"));
        assert!(msg.contains("51 records kept in buffer"));
        assert_eq!(err.kind(), "DurableWriteError");
    }

    #[test]
    fn test_decode_error_from_serde() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: TierError = bad.into();
        assert!(matches!(err, TierError::Decode(_)));
    }
}
