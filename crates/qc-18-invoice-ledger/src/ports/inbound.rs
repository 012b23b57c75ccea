//! # Inbound Ports (Driving Ports)
//!
//! The public API of the Invoice Ledger, used by the RPC layer and the
//! payment-handling logic.

use crate::domain::entities::{Hash, Invoice, InvoiceQuery, InvoiceSlice, MilliSatoshi, Preimage};
use crate::domain::errors::LedgerError;

/// State transitions on the ledger.
///
/// Each call is a single atomic transaction: on error nothing is written.
pub trait InvoiceMutationApi {
    /// Insert a new invoice and return its add index.
    ///
    /// The `add_index` field of `invoice` is ignored and assigned by the
    /// ledger.
    ///
    /// ## Errors
    ///
    /// - `InvalidInvoice`: a field exceeds its size ceiling
    /// - `MissingPreimageOrHash`: no usable preimage (local) or hash (external)
    /// - `DuplicateInvoice`: the payment hash is already indexed
    fn add_invoice(&self, invoice: Invoice) -> Result<u64, LedgerError>;

    /// Mark the invoice paying to `payment_hash` as settled.
    ///
    /// Idempotent: settling an already-settled invoice returns the stored
    /// record unchanged and assigns no new settle index.
    ///
    /// ## Errors
    ///
    /// - `InvoiceNotFound`: no invoice with this hash
    fn settle_invoice(
        &self,
        payment_hash: Hash,
        amt_paid: MilliSatoshi,
    ) -> Result<Invoice, LedgerError>;

    /// Record the preimage of an external-preimage invoice. Write-once.
    ///
    /// ## Errors
    ///
    /// - `InvoiceNotFound`: no invoice with this hash
    /// - `NotExternalPreimageInvoice`: the invoice owns its preimage
    /// - `PreimageAlreadySet`: the preimage was already revealed
    /// - `MissingPreimageOrHash`: `preimage` is all zeros
    fn add_invoice_preimage(
        &self,
        payment_hash: Hash,
        preimage: Preimage,
    ) -> Result<(), LedgerError>;
}

/// Read-only access to the ledger.
///
/// A ledger that has never stored an invoice yields empty results, not
/// errors, from every scan.
pub trait InvoiceQueryApi {
    /// Look up one invoice by payment hash.
    ///
    /// ## Errors
    ///
    /// - `InvoiceNotFound`: no invoice with this hash
    fn lookup_invoice(&self, payment_hash: Hash) -> Result<Invoice, LedgerError>;

    /// All invoices in creation order, optionally skipping settled ones.
    fn fetch_all_invoices(&self, pending_only: bool) -> Result<Vec<Invoice>, LedgerError>;

    /// Invoices with `add_index > since_add_index`, ascending.
    ///
    /// `0` is reserved and always yields an empty result.
    fn invoices_added_since(&self, since_add_index: u64) -> Result<Vec<Invoice>, LedgerError>;

    /// Invoices with `settle_index > since_settle_index`, ascending.
    ///
    /// `0` is reserved and always yields an empty result.
    fn invoices_settled_since(
        &self,
        since_settle_index: u64,
    ) -> Result<Vec<Invoice>, LedgerError>;

    /// Paginate over the add-index time series.
    ///
    /// The returned invoices are always in ascending add-index order,
    /// regardless of `query.reversed`.
    fn query_invoices(&self, query: InvoiceQuery) -> Result<InvoiceSlice, LedgerError>;
}
