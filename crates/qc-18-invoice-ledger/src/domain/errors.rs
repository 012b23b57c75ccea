//! # Domain Errors
//!
//! Error types for the Invoice Ledger subsystem.
//!
//! ## Design Principles
//!
//! - Each error maps to a specific ledger rule violation
//! - Callers match on the variant, never on message text
//! - No panics in domain logic (use Result instead)

use thiserror::Error;

use super::entities::Hash;

/// Errors surfaced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A field exceeds its size ceiling.
    #[error("Invalid invoice: {field} is {len} bytes, max {max}")]
    InvalidInvoice {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Local invoice without a preimage, or external invoice without a hash.
    #[error("{}", missing_preimage_message(*external_preimage))]
    MissingPreimageOrHash { external_preimage: bool },

    /// An invoice with this payment hash is already indexed.
    #[error("Invoice with payment hash {} already exists", short_hex(payment_hash))]
    DuplicateInvoice { payment_hash: Hash },

    /// No invoice matches the given hash or index.
    #[error("Unable to locate invoice")]
    InvoiceNotFound,

    /// The ledger buckets have not been created yet.
    #[error("There are no existing invoices")]
    NoInvoicesCreated,

    /// Preimage reveal attempted on an invoice that owns its preimage.
    #[error("Invoices without an external preimage cannot have their preimage modified")]
    NotExternalPreimageInvoice,

    /// Preimage reveal attempted twice.
    #[error("Preimage already set for invoice {}", short_hex(payment_hash))]
    PreimageAlreadySet { payment_hash: Hash },

    /// Stored record could not be decoded (or a record could not be encoded).
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] KVStoreError),
}

fn missing_preimage_message(external_preimage: bool) -> &'static str {
    if external_preimage {
        "Invoices with an external preimage must have a locally defined payment hash"
    } else {
        "Invoices must have a preimage or use an external preimage"
    }
}

pub(crate) fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

/// Record codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before the field could be read.
    #[error("Truncated record: {field} needs {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Length prefix exceeds the field ceiling.
    #[error("Field {field} is {len} bytes, max {max}")]
    FieldTooLarge {
        field: &'static str,
        len: u64,
        max: usize,
    },

    /// Var-int was not minimally encoded (anti-malleability).
    #[error("Non-canonical varint for {field}")]
    NonCanonicalVarInt { field: &'static str },

    /// Boolean byte other than 0 or 1.
    #[error("Invalid boolean byte {value:#04x} for {field}")]
    InvalidBool { field: &'static str, value: u8 },

    /// Timestamp blob is malformed or out of range.
    #[error("Invalid timestamp for {field}: {reason}")]
    InvalidTimestamp {
        field: &'static str,
        reason: &'static str,
    },

    /// Bytes left over after the last field.
    #[error("Trailing bytes after record: {count}")]
    TrailingBytes { count: usize },
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },

    /// Bucket does not exist.
    #[error("Bucket not found: {bucket}")]
    BucketNotFound { bucket: String },

    /// Data directory is held by another process.
    #[error("Database already in use ({path})")]
    Locked { path: String },
}
