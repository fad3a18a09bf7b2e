//! Core contracts for SMDB: the log-sink capability and the shared error taxonomy.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod error;
pub mod log;

pub use error::{CipherError, StoreError};
pub use log::{LogSink, MemoryLog, NullLog, TracingLog};
