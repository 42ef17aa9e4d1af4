//! Key/value persistence beneath [`GraphStore`](crate::graph::GraphStore).
//!
//! The store writes each vertex and edge as one JSON record:
//! - `vertex:<id>` and `edge:<id>` hold the serialised records
//! - `meta:counters` holds the id counters
//!
//! Implementations:
//! - [`MemoryStorage`]: volatile, used by tests and embedded setups
//! - `RocksDBStorage`: persistent, behind the `rocksdb-backend` feature

mod memory;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;

pub use memory::MemoryStorage;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDBStorage;

use crate::error::Result;

/// Key-value pair returned by prefix scans.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Record prefix for vertices.
pub const VERTEX_PREFIX: &str = "vertex:";

/// Record prefix for edges.
pub const EDGE_PREFIX: &str = "edge:";

/// Key of the id counter record.
pub const COUNTERS_KEY: &[u8] = b"meta:counters";

/// Key of a vertex record.
pub fn vertex_key(id: u64) -> Vec<u8> {
    format!("{VERTEX_PREFIX}{id}").into_bytes()
}

/// Key of an edge record.
pub fn edge_key(id: u64) -> Vec<u8> {
    format!("{EDGE_PREFIX}{id}").into_bytes()
}

/// Byte-oriented record storage.
///
/// Callers serialise access; implementations need not lock internally.
pub trait StorageBackend: Send + Sync {
    /// Store a record, replacing any previous value.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Fetch a record. `Ok(None)` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Drop a record. Missing keys are not an error.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// All records whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>>;

    /// Apply several writes atomically.
    fn write_batch(&mut self, operations: Vec<BatchOperation>) -> Result<()>;

    /// Make previous writes durable.
    fn flush(&mut self) -> Result<()>;
}

/// Batch write operation for atomic updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair
    Put {
        /// Key to write
        key: Vec<u8>,
        /// Value to write
        value: Vec<u8>,
    },
    /// Delete a key
    Delete {
        /// Key to delete
        key: Vec<u8>,
    },
}
