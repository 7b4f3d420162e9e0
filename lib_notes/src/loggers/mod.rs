//! # Loggers Module
//!
//! Process-wide `tracing` subscriber setup shared by the binaries.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogGuard, LoggerError};
