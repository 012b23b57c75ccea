//! # Invoice Validation
//!
//! Size ceilings are part of the wire contract: an oversized field is a
//! validation error, never a truncation.

use super::entities::Invoice;
use super::errors::LedgerError;

/// Field size limits.
pub mod limits {
    /// Maximum memo size in bytes.
    pub const MAX_MEMO_SIZE: usize = 1024;

    /// Maximum receipt size in bytes.
    pub const MAX_RECEIPT_SIZE: usize = 1024;

    /// Maximum payment request size in bytes.
    pub const MAX_PAYMENT_REQUEST_SIZE: usize = 4096;

    /// Maximum encoded timestamp blob size in bytes.
    pub const MAX_TIMESTAMP_SIZE: usize = 300;
}

/// Check every bounded field against its ceiling.
pub fn validate_invoice(invoice: &Invoice) -> Result<(), LedgerError> {
    check_len("memo", invoice.memo.len(), limits::MAX_MEMO_SIZE)?;
    check_len("receipt", invoice.receipt.len(), limits::MAX_RECEIPT_SIZE)?;
    check_len(
        "payment_request",
        invoice.payment_request.len(),
        limits::MAX_PAYMENT_REQUEST_SIZE,
    )
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), LedgerError> {
    if len > max {
        return Err(LedgerError::InvalidInvoice { field, len, max });
    }
    Ok(())
}
