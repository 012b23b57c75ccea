//! # File-Backed Transactional Store
//!
//! The in-memory engine plus durability: after every committed write
//! transaction the whole bucket set is written to a temp file with `bincode`
//! and atomically renamed over the ledger file. If that fails the transaction
//! is rolled back in memory too, so memory and disk never diverge.

use parking_lot::RwLock;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::memory::{run_update, run_view, StoreState};
use crate::adapters::lock::DatabaseLock;
use crate::domain::config::LedgerConfig;
use crate::domain::errors::{KVStoreError, LedgerError};
use crate::ports::outbound::{KeyValueStore, ReadTransaction, WriteTransaction};

/// File-backed key-value store.
pub struct FileBackedKVStore {
    state: RwLock<StoreState>,
    path: PathBuf,
    sync_writes: bool,
    _lock: DatabaseLock,
}

impl FileBackedKVStore {
    /// Open (or create) the ledger file described by `config`.
    ///
    /// Takes an exclusive lock on the data directory for the lifetime of the
    /// store.
    pub fn open(config: &LedgerConfig) -> Result<Self, KVStoreError> {
        fs::create_dir_all(&config.data_dir).map_err(|e| KVStoreError::IOError {
            message: format!("Failed to create {}: {}", config.data_dir.display(), e),
        })?;
        let lock = DatabaseLock::acquire(&config.data_dir, config.lock_timeout)?;

        let path = config.ledger_path();
        let state = Self::load_from_file(&path)?;

        if state.buckets.is_empty() {
            tracing::info!("[qc-18] 📁 No existing ledger at {}", path.display());
        } else {
            tracing::info!(
                "[qc-18] 💾 Loaded {} buckets from {}",
                state.buckets.len(),
                path.display()
            );
        }

        Ok(Self {
            state: RwLock::new(state),
            path,
            sync_writes: config.sync_writes,
            _lock: lock,
        })
    }

    /// Path of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_file(path: &Path) -> Result<StoreState, KVStoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreState::default());
            }
            Err(e) => {
                return Err(KVStoreError::IOError {
                    message: format!("Failed to read {}: {}", path.display(), e),
                })
            }
        };

        bincode::deserialize(&bytes).map_err(|e| KVStoreError::CorruptionError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    fn save_to_file(path: &Path, state: &StoreState, sync: bool) -> Result<(), KVStoreError> {
        let io_err = |e: std::io::Error| KVStoreError::IOError {
            message: e.to_string(),
        };

        let bytes = bincode::serialize(state).map_err(|e| KVStoreError::IOError {
            message: format!("Failed to serialize ledger: {}", e),
        })?;

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        if sync {
            file.sync_all().map_err(io_err)?;
        }
        drop(file);

        fs::rename(&temp_path, path).map_err(io_err)
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn view<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&dyn ReadTransaction) -> Result<T, LedgerError>,
    {
        let state = self.state.read();
        run_view(&state, f)
    }

    fn update<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut dyn WriteTransaction) -> Result<T, LedgerError>,
    {
        let mut state = self.state.write();
        run_update(&mut state, f, |committed| {
            Self::save_to_file(&self.path, committed, self.sync_writes)
        })
    }
}
