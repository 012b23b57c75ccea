//! # Invoice Ledger (qc-18)
//!
//! Persistent ledger of payment invoices with two event time series: one
//! entry per invoice added and one per invoice settled. Clients that
//! reconnect resume from the last add/settle index they saw.
//!
//! ## Architecture
//!
//! ```text
//! RPC / payment logic
//!         │
//!         ▼
//! InvoiceMutationApi ─┐            ┌─► Record Codec
//! InvoiceQueryApi ────┼─► Service ─┼─► Index Manager
//!                     │            └─► KeyValueStore (one txn per call)
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Unique Payment Hash | One invoice per hash, enforced by the dedup index |
//! | 2 | Gapless Sequences | Add and settle indexes start at 1 and never skip |
//! | 3 | Write-Once Preimage | An external preimage is revealed at most once |
//! | 4 | Monotonic Settlement | Settling twice is a no-op |
//! | 5 | Append-Only | Invoices are never deleted |
//! | 6 | Atomic Operations | A failed call leaves no partial writes |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, codec, key layout, validation, config, errors
//! - `ports/` - Port traits (inbound API, outbound store and clock)
//! - `adapters/` - In-memory and file-backed stores, clocks, directory lock
//! - `service/` - Application service implementing the API
//!
//! ## Usage
//!
//! ```ignore
//! use qc_18_invoice_ledger::{InvoiceLedgerService, InvoiceMutationApi, InvoiceQueryApi};
//!
//! let ledger = InvoiceLedgerService::new_in_memory();
//! let add_index = ledger.add_invoice(invoice)?;
//! let settled = ledger.settle_invoice(payment_hash, amt_paid)?;
//! let missed = ledger.invoices_settled_since(last_seen)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(test)]
mod test_utils;

// Re-export key types for convenience
pub use domain::config::LedgerConfig;
pub use domain::entities::{
    ContractTerm, Hash, Invoice, InvoiceQuery, InvoiceSlice, MilliSatoshi, Preimage, ZERO_HASH,
    ZERO_PREIMAGE,
};
pub use domain::errors::{CodecError, KVStoreError, LedgerError};
pub use ports::inbound::{InvoiceMutationApi, InvoiceQueryApi};
pub use ports::outbound::{Cursor, KeyValueStore, ReadTransaction, TimeSource, WriteTransaction};
pub use service::InvoiceLedgerService;

pub use adapters::{FixedTimeSource, InMemoryKVStore, SystemTimeSource};
#[cfg(feature = "file-store")]
pub use adapters::FileBackedKVStore;
