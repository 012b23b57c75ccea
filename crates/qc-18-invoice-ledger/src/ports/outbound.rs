//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the Invoice Ledger service.
//!
//! The ledger needs an ordered, transactional key-value store: named buckets,
//! lexicographically ordered cursors, and a monotonic sequence per bucket.
//! Every public ledger operation runs inside exactly one transaction.

use chrono::{DateTime, Utc};

use crate::domain::errors::{KVStoreError, LedgerError};

/// A key/value pair yielded by a cursor.
pub type Entry = (Vec<u8>, Vec<u8>);

/// Transactional key-value store.
///
/// Production: `FileBackedKVStore`
/// Testing: `InMemoryKVStore`
///
/// ## Isolation
///
/// One writer OR many readers. A read transaction observes a consistent
/// snapshot; a write transaction sees its own writes.
pub trait KeyValueStore: Send + Sync {
    /// Run `f` inside a read-only transaction.
    fn view<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&dyn ReadTransaction) -> Result<T, LedgerError>;

    /// Run `f` inside a read-write transaction.
    ///
    /// ## Atomicity
    ///
    /// Committed only if `f` returns `Ok`. On `Err` (or unwind) every write
    /// made inside `f`, including sequence increments, is discarded.
    fn update<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut dyn WriteTransaction) -> Result<T, LedgerError>;
}

/// Read operations available inside any transaction.
pub trait ReadTransaction {
    /// Check whether a bucket has been created.
    fn bucket_exists(&self, bucket: &[u8]) -> bool;

    /// Get a value. `Ok(None)` if the key or the bucket is absent.
    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Ordered cursor over a bucket, or `None` if the bucket is absent.
    fn cursor<'a>(&'a self, bucket: &[u8]) -> Option<Box<dyn Cursor + 'a>>;
}

/// Write operations available inside an `update` transaction.
pub trait WriteTransaction: ReadTransaction {
    /// Create a bucket if it does not exist yet.
    fn create_bucket_if_absent(&mut self, bucket: &[u8]) -> Result<(), KVStoreError>;

    /// Put a key-value pair. The bucket must exist.
    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key. The bucket must exist.
    fn delete(&mut self, bucket: &[u8], key: &[u8]) -> Result<(), KVStoreError>;

    /// Increment the bucket's sequence and return the new value.
    ///
    /// Sequences start at 0, so the first call returns 1.
    fn next_sequence(&mut self, bucket: &[u8]) -> Result<u64, KVStoreError>;
}

/// Ordered cursor over one bucket.
///
/// Keys are compared as raw bytes. Every positioning call returns the entry
/// the cursor lands on, or `None` when it runs off either end.
pub trait Cursor {
    /// Move to the first entry.
    fn first(&mut self) -> Option<Entry>;

    /// Move to the last entry.
    fn last(&mut self) -> Option<Entry>;

    /// Move to the first entry whose key is `>= key`.
    fn seek(&mut self, key: &[u8]) -> Option<Entry>;

    /// Move to the next entry.
    fn next(&mut self) -> Option<Entry>;

    /// Move to the previous entry.
    fn prev(&mut self) -> Option<Entry>;
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}
