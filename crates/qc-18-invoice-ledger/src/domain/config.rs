//! # Ledger Configuration
//!
//! All values have sensible defaults; override with the builder methods or
//! from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`LedgerConfig::data_dir`].
pub const ENV_DATA_DIR: &str = "QC_INVOICE_DATA_DIR";

/// Environment variable overriding [`LedgerConfig::sync_writes`].
pub const ENV_SYNC_WRITES: &str = "QC_INVOICE_SYNC_WRITES";

/// Name of the ledger file inside the data directory.
pub const LEDGER_FILE_NAME: &str = "invoices.db";

/// Configuration for a persistent invoice ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Directory holding the ledger file and its lock file.
    pub data_dir: PathBuf,

    /// fsync the ledger file after every committed write (default: true).
    pub sync_writes: bool,

    /// How long to wait for another process to release the data directory.
    pub lock_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/invoices"),
            sync_writes: true,
            lock_timeout: Duration::from_secs(5),
        }
    }
}

impl LedgerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `QC_INVOICE_DATA_DIR` and `QC_INVOICE_SYNC_WRITES`.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from a key lookup. Unparseable values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_SYNC_WRITES) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.sync_writes = true,
                "0" | "false" | "no" | "off" => self.sync_writes = false,
                other => {
                    tracing::warn!("[qc-18] Ignoring {}={:?}", ENV_SYNC_WRITES, other);
                }
            }
        }
        self
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Enable or disable fsync on commit.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Set the lock acquisition timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Full path of the ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert!(config.sync_writes);
        assert_eq!(config.ledger_path(), PathBuf::from("./data/invoices/invoices.db"));
    }

    #[test]
    fn test_builder() {
        let config = LedgerConfig::new()
            .with_data_dir("/tmp/ledger")
            .with_sync_writes(false)
            .with_lock_timeout(Duration::from_millis(10));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ledger"));
        assert!(!config.sync_writes);
        assert_eq!(config.lock_timeout, Duration::from_millis(10));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [(ENV_DATA_DIR, "/var/lib/qc"), (ENV_SYNC_WRITES, "off")].into();
        let config =
            LedgerConfig::default().with_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/qc"));
        assert!(!config.sync_writes);
    }

    #[test]
    fn test_env_overrides_ignore_garbage() {
        let config = LedgerConfig::default().with_env_overrides(|k| match k {
            ENV_SYNC_WRITES => Some("maybe".to_string()),
            ENV_DATA_DIR => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config, LedgerConfig::default());
    }
}
