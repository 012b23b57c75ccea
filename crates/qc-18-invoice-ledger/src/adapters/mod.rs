//! # Adapters Module
//!
//! Contains adapter implementations for the Invoice Ledger subsystem.
//!
//! ## Modules
//!
//! - `storage`: Transactional key-value stores (in-memory, file-backed)
//! - `infra`: Clock implementations
//! - `lock`: Data directory locking (singleton guard)

pub mod infra;
#[cfg(feature = "file-store")]
pub mod lock;
pub mod storage;

pub use infra::{FixedTimeSource, SystemTimeSource};
#[cfg(feature = "file-store")]
pub use lock::DatabaseLock;
#[cfg(feature = "file-store")]
pub use storage::FileBackedKVStore;
pub use storage::InMemoryKVStore;
