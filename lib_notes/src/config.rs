//! # Store Configuration
//!
//! The two inputs the orchestrator consumes but does not own: the namespace
//! key and the compaction threshold.

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Buffer length above which a submit compacts the buffer.
pub const DEFAULT_THRESHOLD: usize = 50;

/// Prefix of the namespace derived from a first name.
pub const NAMESPACE_PREFIX: &str = "FULLSTACK_TASK_";

/// Validated namespace and threshold.
///
/// Deserialising goes through the same checks as `StoreConfig::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedStoreConfig")]
pub struct StoreConfig {
    namespace: String,
    threshold: usize,
}

#[derive(Deserialize)]
struct UncheckedStoreConfig {
    namespace: String,
    threshold: usize,
}

impl TryFrom<UncheckedStoreConfig> for StoreConfig {
    type Error = StoreError;

    fn try_from(raw: UncheckedStoreConfig) -> Result<Self, Self::Error> {
        StoreConfig::new(raw.namespace, raw.threshold)
    }
}

impl StoreConfig {
    /// Creates a configuration, rejecting an empty namespace or a zero threshold.
    pub fn new(namespace: impl Into<String>, threshold: usize) -> Result<Self, StoreError> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(StoreError::Config("namespace must not be empty".to_string()));
        }
        if threshold == 0 {
            return Err(StoreError::Config(
                "compaction threshold must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            namespace,
            threshold,
        })
    }

    /// Default namespace naming: `FULLSTACK_TASK_<first_name>`.
    pub fn namespace_for(first_name: &str) -> String {
        format!("{}{}", NAMESPACE_PREFIX, first_name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: Self::namespace_for("User"),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
