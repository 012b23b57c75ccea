//! # Index Manager
//!
//! Key assignment and index maintenance over the four invoice buckets.
//! Every helper runs inside a caller-supplied transaction and never commits.
//!
//! Helpers are generic over `?Sized` transactions so they accept both
//! `&dyn ReadTransaction` and `&mut dyn WriteTransaction`.

use crate::domain::codec::{decode_invoice, encode_invoice};
use crate::domain::entities::{Hash, Invoice};
use crate::domain::errors::{short_hex, KVStoreError, LedgerError};
use crate::domain::keys::{
    invoice_key, parse_invoice_key, parse_invoice_num, sequence_key, InvoiceKey, ADD_INDEX_BUCKET,
    INVOICE_BUCKET, NUM_INVOICES_KEY, PAYMENT_HASH_INDEX_BUCKET, SETTLE_INDEX_BUCKET,
};
use crate::ports::outbound::{ReadTransaction, WriteTransaction};

/// Create all four invoice buckets.
pub(crate) fn create_buckets<T>(tx: &mut T) -> Result<(), LedgerError>
where
    T: WriteTransaction + ?Sized,
{
    for bucket in [
        INVOICE_BUCKET,
        PAYMENT_HASH_INDEX_BUCKET,
        ADD_INDEX_BUCKET,
        SETTLE_INDEX_BUCKET,
    ] {
        tx.create_bucket_if_absent(bucket)?;
    }
    Ok(())
}

/// Take the next unused invoice number and advance the counter.
///
/// The counter starts at 0, so the first invoice is stored under key 0.
pub(crate) fn next_invoice_number<T>(tx: &mut T) -> Result<u32, LedgerError>
where
    T: WriteTransaction + ?Sized,
{
    let current = match tx.get(PAYMENT_HASH_INDEX_BUCKET, NUM_INVOICES_KEY)? {
        Some(bytes) => parse_invoice_num(&bytes)?,
        None => 0,
    };
    let next = current
        .checked_add(1)
        .ok_or_else(|| KVStoreError::CorruptionError {
            message: "invoice counter exhausted".to_string(),
        })?;
    tx.put(PAYMENT_HASH_INDEX_BUCKET, NUM_INVOICES_KEY, &invoice_key(next))?;
    Ok(current)
}

/// Invoice key indexed under `payment_hash`, if any.
pub(crate) fn lookup_by_hash<T>(
    tx: &T,
    payment_hash: &Hash,
) -> Result<Option<InvoiceKey>, LedgerError>
where
    T: ReadTransaction + ?Sized,
{
    match tx.get(PAYMENT_HASH_INDEX_BUCKET, payment_hash)? {
        Some(bytes) => Ok(Some(parse_invoice_key(&bytes)?)),
        None => Ok(None),
    }
}

/// Index `payment_hash` to `key`.
///
/// ## Errors
///
/// - `DuplicateInvoice`: the hash is already indexed
pub(crate) fn record_hash<T>(
    tx: &mut T,
    payment_hash: &Hash,
    key: &InvoiceKey,
) -> Result<(), LedgerError>
where
    T: WriteTransaction + ?Sized,
{
    if tx.get(PAYMENT_HASH_INDEX_BUCKET, payment_hash)?.is_some() {
        return Err(LedgerError::DuplicateInvoice {
            payment_hash: *payment_hash,
        });
    }
    tx.put(PAYMENT_HASH_INDEX_BUCKET, payment_hash, key)?;
    Ok(())
}

pub(crate) fn next_add_seq<T>(tx: &mut T) -> Result<u64, LedgerError>
where
    T: WriteTransaction + ?Sized,
{
    Ok(tx.next_sequence(ADD_INDEX_BUCKET)?)
}

pub(crate) fn next_settle_seq<T>(tx: &mut T) -> Result<u64, LedgerError>
where
    T: WriteTransaction + ?Sized,
{
    Ok(tx.next_sequence(SETTLE_INDEX_BUCKET)?)
}

pub(crate) fn map_add_seq<T>(tx: &mut T, seq: u64, key: &InvoiceKey) -> Result<(), LedgerError>
where
    T: WriteTransaction + ?Sized,
{
    Ok(tx.put(ADD_INDEX_BUCKET, &sequence_key(seq), key)?)
}

pub(crate) fn map_settle_seq<T>(tx: &mut T, seq: u64, key: &InvoiceKey) -> Result<(), LedgerError>
where
    T: WriteTransaction + ?Sized,
{
    Ok(tx.put(SETTLE_INDEX_BUCKET, &sequence_key(seq), key)?)
}

/// Load and decode the invoice stored under `key`.
///
/// ## Errors
///
/// - `InvoiceNotFound`: an index points at a missing record
pub(crate) fn fetch_invoice<T>(tx: &T, key: &[u8]) -> Result<Invoice, LedgerError>
where
    T: ReadTransaction + ?Sized,
{
    let bytes = tx
        .get(INVOICE_BUCKET, key)?
        .ok_or(LedgerError::InvoiceNotFound)?;
    Ok(decode_invoice(&bytes)?)
}

/// Encode and store `invoice` under `key`, overwriting any previous record.
pub(crate) fn put_invoice<T>(tx: &mut T, key: &InvoiceKey, invoice: &Invoice) -> Result<(), LedgerError>
where
    T: WriteTransaction + ?Sized,
{
    let bytes = encode_invoice(invoice)?;
    tx.put(INVOICE_BUCKET, key, &bytes)?;
    Ok(())
}

/// Resolve `payment_hash` to its key and record.
///
/// ## Errors
///
/// - `InvoiceNotFound`: the hash is not indexed
pub(crate) fn fetch_by_hash<T>(
    tx: &T,
    payment_hash: &Hash,
) -> Result<(InvoiceKey, Invoice), LedgerError>
where
    T: ReadTransaction + ?Sized,
{
    let Some(key) = lookup_by_hash(tx, payment_hash)? else {
        tracing::debug!("[qc-18] No invoice for hash {}", short_hex(payment_hash));
        return Err(LedgerError::InvoiceNotFound);
    };
    let invoice = fetch_invoice(tx, &key)?;
    Ok((key, invoice))
}
