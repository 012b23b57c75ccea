//! # Query Engine
//!
//! Point lookup, full scan, since-index catch-up and pagination over the add
//! time series. All reads run in one read transaction, so a result never mixes
//! two ledger states.
//!
//! A ledger that has never stored an invoice has no buckets. Scans report
//! that as `NoInvoicesCreated` internally and hand the caller an empty result.

use super::index;
use super::InvoiceLedgerService;
use crate::domain::codec::decode_invoice;
use crate::domain::entities::{Hash, Invoice, InvoiceQuery, InvoiceSlice};
use crate::domain::errors::LedgerError;
use crate::domain::keys::{
    parse_sequence, sequence_key, ADD_INDEX_BUCKET, INVOICE_BUCKET, SETTLE_INDEX_BUCKET,
};
use crate::ports::inbound::InvoiceQueryApi;
use crate::ports::outbound::{Cursor, Entry, KeyValueStore, ReadTransaction, TimeSource};

impl<KV, TS> InvoiceQueryApi for InvoiceLedgerService<KV, TS>
where
    KV: KeyValueStore,
    TS: TimeSource,
{
    fn lookup_invoice(&self, payment_hash: Hash) -> Result<Invoice, LedgerError> {
        self.kv_store
            .view(|tx| index::fetch_by_hash(tx, &payment_hash).map(|(_, invoice)| invoice))
    }

    fn fetch_all_invoices(&self, pending_only: bool) -> Result<Vec<Invoice>, LedgerError> {
        let result = self.kv_store.view(|tx| {
            let mut cursor = tx
                .cursor(INVOICE_BUCKET)
                .ok_or(LedgerError::NoInvoicesCreated)?;

            let mut invoices = Vec::new();
            let mut entry = cursor.first();
            while let Some((_, value)) = entry {
                let invoice = decode_invoice(&value)?;
                if !(pending_only && invoice.is_settled()) {
                    invoices.push(invoice);
                }
                entry = cursor.next();
            }
            Ok(invoices)
        });
        empty_if_uninitialized(result)
    }

    fn invoices_added_since(&self, since_add_index: u64) -> Result<Vec<Invoice>, LedgerError> {
        if since_add_index == 0 {
            return Ok(Vec::new());
        }
        let result = self
            .kv_store
            .view(|tx| scan_after(tx, ADD_INDEX_BUCKET, since_add_index));
        empty_if_uninitialized(result)
    }

    fn invoices_settled_since(
        &self,
        since_settle_index: u64,
    ) -> Result<Vec<Invoice>, LedgerError> {
        if since_settle_index == 0 {
            return Ok(Vec::new());
        }
        let result = self
            .kv_store
            .view(|tx| scan_after(tx, SETTLE_INDEX_BUCKET, since_settle_index));
        empty_if_uninitialized(result)
    }

    fn query_invoices(&self, query: InvoiceQuery) -> Result<InvoiceSlice, LedgerError> {
        let invoices = empty_if_uninitialized(self.kv_store.view(|tx| paginate(tx, &query)))?;

        let first_index_offset = invoices.first().map_or(0, |i| i.add_index);
        let last_index_offset = invoices.last().map_or(0, |i| i.add_index);

        tracing::debug!(
            "[qc-18] Query offset={} max={} reversed={} returned {} invoices",
            query.index_offset,
            query.num_max_invoices,
            query.reversed,
            invoices.len()
        );

        Ok(InvoiceSlice {
            query,
            invoices,
            first_index_offset,
            last_index_offset,
        })
    }
}

/// Map the "ledger never used" condition to an empty result.
fn empty_if_uninitialized<T: Default>(result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    match result {
        Err(LedgerError::NoInvoicesCreated) => Ok(T::default()),
        other => other,
    }
}

/// Cursor over a sequence bucket, failing if either it or the primary bucket
/// is missing.
fn sequence_cursor<'a, T>(tx: &'a T, bucket: &[u8]) -> Result<Box<dyn Cursor + 'a>, LedgerError>
where
    T: ReadTransaction + ?Sized,
{
    if !tx.bucket_exists(INVOICE_BUCKET) {
        return Err(LedgerError::NoInvoicesCreated);
    }
    tx.cursor(bucket).ok_or(LedgerError::NoInvoicesCreated)
}

/// Every invoice whose sequence in `bucket` is strictly greater than `since`.
fn scan_after<T>(tx: &T, bucket: &[u8], since: u64) -> Result<Vec<Invoice>, LedgerError>
where
    T: ReadTransaction + ?Sized,
{
    let mut cursor = sequence_cursor(tx, bucket)?;

    let mut invoices = Vec::new();
    let mut entry = cursor.seek(&sequence_key(since));
    while let Some((seq, invoice_key)) = entry {
        if parse_sequence(&seq)? > since {
            invoices.push(index::fetch_invoice(tx, &invoice_key)?);
        }
        entry = cursor.next();
    }
    Ok(invoices)
}

/// Walk the add index as described by `query`, returning ascending results.
fn paginate<T>(tx: &T, query: &InvoiceQuery) -> Result<Vec<Invoice>, LedgerError>
where
    T: ReadTransaction + ?Sized,
{
    let mut cursor = sequence_cursor(tx, ADD_INDEX_BUCKET)?;

    let mut entry: Option<Entry> = if query.reversed {
        match query.index_offset {
            0 => cursor.last(),
            // Nothing precedes the first invoice.
            1 => return Ok(Vec::new()),
            offset => cursor.seek(&sequence_key(offset - 1)),
        }
    } else {
        match query.index_offset.checked_add(1) {
            Some(start) => cursor.seek(&sequence_key(start)),
            None => None,
        }
    };

    let mut invoices = Vec::new();
    while let Some((_, invoice_key)) = entry {
        if invoices.len() as u64 >= query.num_max_invoices {
            break;
        }

        let invoice = index::fetch_invoice(tx, &invoice_key)?;
        if !(query.pending_only && invoice.is_settled()) {
            invoices.push(invoice);
        }

        entry = if query.reversed {
            cursor.prev()
        } else {
            cursor.next()
        };
    }

    if query.reversed {
        invoices.reverse();
    }
    Ok(invoices)
}
