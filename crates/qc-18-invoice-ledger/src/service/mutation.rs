//! # Mutation Engine
//!
//! Add, settle and preimage-reveal transitions. Each call is one write
//! transaction; any error discards every write it made.

use super::index;
use super::InvoiceLedgerService;
use crate::domain::entities::{Hash, Invoice, MilliSatoshi, Preimage, ZERO_PREIMAGE};
use crate::domain::errors::{short_hex, LedgerError};
use crate::domain::keys::invoice_key;
use crate::domain::validation::validate_invoice;
use crate::ports::inbound::InvoiceMutationApi;
use crate::ports::outbound::{KeyValueStore, TimeSource};

impl<KV, TS> InvoiceMutationApi for InvoiceLedgerService<KV, TS>
where
    KV: KeyValueStore,
    TS: TimeSource,
{
    fn add_invoice(&self, mut invoice: Invoice) -> Result<u64, LedgerError> {
        validate_invoice(&invoice)?;

        let add_index = self.kv_store.update(|tx| {
            index::create_buckets(tx)?;

            let payment_hash = invoice.payment_hash()?;
            let key = invoice_key(index::next_invoice_number(tx)?);
            index::record_hash(tx, &payment_hash, &key)?;

            let add_index = index::next_add_seq(tx)?;
            invoice.add_index = add_index;
            index::put_invoice(tx, &key, &invoice)?;
            index::map_add_seq(tx, add_index, &key)?;

            tracing::info!(
                "[qc-18] ➕ Invoice {} added (add_index={}, value={})",
                short_hex(&payment_hash),
                add_index,
                invoice.terms.value
            );
            Ok(add_index)
        })?;

        Ok(add_index)
    }

    fn settle_invoice(
        &self,
        payment_hash: Hash,
        amt_paid: MilliSatoshi,
    ) -> Result<Invoice, LedgerError> {
        self.kv_store.update(|tx| {
            index::create_buckets(tx)?;

            let (key, mut invoice) = index::fetch_by_hash(&*tx, &payment_hash)?;
            if invoice.terms.settled {
                tracing::debug!(
                    "[qc-18] Invoice {} already settled (settle_index={})",
                    short_hex(&payment_hash),
                    invoice.settle_index
                );
                return Ok(invoice);
            }

            let settle_index = index::next_settle_seq(tx)?;
            index::map_settle_seq(tx, settle_index, &key)?;

            invoice.terms.settled = true;
            invoice.amt_paid = amt_paid;
            invoice.settle_date = Some(self.time_source.now());
            invoice.settle_index = settle_index;
            index::put_invoice(tx, &key, &invoice)?;

            tracing::info!(
                "[qc-18] ✅ Invoice {} settled (settle_index={}, amt_paid={})",
                short_hex(&payment_hash),
                settle_index,
                amt_paid
            );
            Ok(invoice)
        })
    }

    fn add_invoice_preimage(
        &self,
        payment_hash: Hash,
        preimage: Preimage,
    ) -> Result<(), LedgerError> {
        if preimage == ZERO_PREIMAGE {
            return Err(LedgerError::MissingPreimageOrHash {
                external_preimage: true,
            });
        }

        self.kv_store.update(|tx| {
            index::create_buckets(tx)?;

            let (key, mut invoice) = index::fetch_by_hash(&*tx, &payment_hash)?;
            if !invoice.terms.external_preimage {
                return Err(LedgerError::NotExternalPreimageInvoice);
            }
            if invoice.terms.payment_preimage != ZERO_PREIMAGE {
                return Err(LedgerError::PreimageAlreadySet { payment_hash });
            }

            invoice.terms.payment_preimage = preimage;
            index::put_invoice(tx, &key, &invoice)?;

            tracing::info!(
                "[qc-18] 🔑 Preimage revealed for invoice {}",
                short_hex(&payment_hash)
            );
            Ok(())
        })
    }
}
