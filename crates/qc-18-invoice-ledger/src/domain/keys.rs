//! # Key Layout
//!
//! Bucket names and key encodings for the invoice namespace.
//!
//! | Bucket | Key | Value |
//! |--------|-----|-------|
//! | `invoices` | invoice number (u32 BE) | encoded invoice |
//! | `invoices/payment-hashes` | payment hash (32 bytes) | invoice number |
//! | `invoices/payment-hashes` | `nik` | next invoice number |
//! | `invoices/add-index` | add sequence (u64 BE) | invoice number |
//! | `invoices/settle-index` | settle sequence (u64 BE) | invoice number |
//!
//! All numeric keys are big-endian so that byte order equals numeric order.
//! Range scans and reverse pagination depend on this.

use super::errors::CodecError;

/// Primary store: invoice number -> encoded invoice.
pub const INVOICE_BUCKET: &[u8] = b"invoices";

/// Dedup index: payment hash -> invoice number, plus the invoice counter.
pub const PAYMENT_HASH_INDEX_BUCKET: &[u8] = b"invoices/payment-hashes";

/// Add time series: add sequence -> invoice number.
pub const ADD_INDEX_BUCKET: &[u8] = b"invoices/add-index";

/// Settle time series: settle sequence -> invoice number.
pub const SETTLE_INDEX_BUCKET: &[u8] = b"invoices/settle-index";

/// Counter key inside the payment hash index holding the next invoice number.
pub const NUM_INVOICES_KEY: &[u8] = b"nik";

/// Primary key of an invoice record.
pub type InvoiceKey = [u8; 4];

/// Key of an add or settle sequence entry.
pub type SequenceKey = [u8; 8];

pub fn invoice_key(invoice_num: u32) -> InvoiceKey {
    invoice_num.to_be_bytes()
}

pub fn sequence_key(seq: u64) -> SequenceKey {
    seq.to_be_bytes()
}

/// Parse a 4-byte invoice number stored as a value.
pub fn parse_invoice_key(bytes: &[u8]) -> Result<InvoiceKey, CodecError> {
    bytes.try_into().map_err(|_| CodecError::Truncated {
        field: "invoice_key",
        needed: 4,
        remaining: bytes.len(),
    })
}

pub fn parse_invoice_num(bytes: &[u8]) -> Result<u32, CodecError> {
    parse_invoice_key(bytes).map(u32::from_be_bytes)
}

pub fn parse_sequence(bytes: &[u8]) -> Result<u64, CodecError> {
    let key: SequenceKey = bytes.try_into().map_err(|_| CodecError::Truncated {
        field: "sequence_key",
        needed: 8,
        remaining: bytes.len(),
    })?;
    Ok(u64::from_be_bytes(key))
}
