//! # Invoice Ledger Service
//!
//! The main service implementing the Invoice Ledger API.
//!
//! ## Architecture
//!
//! This service:
//! 1. Implements `InvoiceMutationApi` (add, settle, reveal preimage)
//! 2. Implements `InvoiceQueryApi` (lookup, scans, pagination)
//! 3. Runs every operation in exactly one store transaction
//! 4. Keeps no state of its own: counters and indexes live in the store

mod index;
mod mutation;
mod query;

use crate::adapters::{InMemoryKVStore, SystemTimeSource};
use crate::ports::outbound::{KeyValueStore, TimeSource};

#[cfg(feature = "file-store")]
use crate::adapters::FileBackedKVStore;
#[cfg(feature = "file-store")]
use crate::domain::config::LedgerConfig;
#[cfg(feature = "file-store")]
use crate::domain::errors::LedgerError;

/// The Invoice Ledger Service.
///
/// Cheap to share behind an `Arc`: all methods take `&self` and the store
/// provides the isolation.
pub struct InvoiceLedgerService<KV, TS>
where
    KV: KeyValueStore,
    TS: TimeSource,
{
    /// Transactional store holding invoices, indexes and counters.
    pub(crate) kv_store: KV,
    /// Clock used to stamp settlements.
    pub(crate) time_source: TS,
}

impl<KV, TS> InvoiceLedgerService<KV, TS>
where
    KV: KeyValueStore,
    TS: TimeSource,
{
    /// Create a new service over the given store and clock.
    pub fn new(kv_store: KV, time_source: TS) -> Self {
        Self {
            kv_store,
            time_source,
        }
    }

    /// Access the underlying store.
    pub fn kv_store(&self) -> &KV {
        &self.kv_store
    }
}

impl InvoiceLedgerService<InMemoryKVStore, SystemTimeSource> {
    /// Volatile ledger, lost when dropped.
    pub fn new_in_memory() -> Self {
        Self::new(InMemoryKVStore::new(), SystemTimeSource)
    }
}

#[cfg(feature = "file-store")]
impl InvoiceLedgerService<FileBackedKVStore, SystemTimeSource> {
    /// Open the persistent ledger in `config.data_dir`.
    ///
    /// ## Errors
    ///
    /// - `Store(Locked)`: another process holds the data directory
    /// - `Store(CorruptionError)`: the ledger file cannot be decoded
    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let kv_store = FileBackedKVStore::open(config)?;
        tracing::info!(
            "[qc-18] Invoice ledger opened at {}",
            kv_store.path().display()
        );
        Ok(Self::new(kv_store, SystemTimeSource))
    }
}
