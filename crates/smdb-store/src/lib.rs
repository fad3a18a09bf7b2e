//! File-backed key-value store with encryption at rest.
//! The working set lives in memory in encoded form and persists as one file
//! per key under `<base>/smdb/<name>`, through an AES-256-GCM cipher, an
//! XOR-stream obfuscator, or no cipher at all (fallback chain in that order).

pub mod cipher;
pub mod config;
pub mod query;
pub mod store;

pub use cipher::Cipher;
pub use config::{ConfigError, StoreConfig};
pub use query::QueryRule;
pub use store::{Smdb, SmdbBuilder};
