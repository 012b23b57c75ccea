//! # Ledger Entities
//!
//! Core domain entities for the Invoice Ledger subsystem.
//!
//! An invoice is never deleted. It is created once, may have its external
//! preimage revealed once, and may be settled once. All other fields are
//! immutable after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::errors::LedgerError;

/// 32-byte SHA-256 payment hash.
pub type Hash = [u8; 32];

/// 32-byte payment preimage.
pub type Preimage = [u8; 32];

/// All-zero hash, used as the "absent" marker.
pub const ZERO_HASH: Hash = [0u8; 32];

/// All-zero preimage, meaning "not yet known".
pub const ZERO_PREIMAGE: Preimage = [0u8; 32];

/// Amount in thousandths of a satoshi.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MilliSatoshi(pub u64);

impl MilliSatoshi {
    /// Convert a whole-satoshi amount.
    pub const fn from_satoshis(sat: u64) -> Self {
        Self(sat * 1000)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MilliSatoshi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mSAT", self.0)
    }
}

/// Settlement contract embedded in an [`Invoice`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerm {
    /// The preimage is supplied later, out of band.
    pub external_preimage: bool,
    /// Authoritative only when `external_preimage` is set.
    pub payment_hash: Hash,
    /// All zeros until known.
    pub payment_preimage: Preimage,
    /// Requested amount (zero means unspecified).
    pub value: MilliSatoshi,
    pub settled: bool,
}

/// A payment request with its settlement terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub memo: Vec<u8>,
    pub receipt: Vec<u8>,
    pub payment_request: Vec<u8>,
    pub creation_date: DateTime<Utc>,
    /// `None` until settled.
    pub settle_date: Option<DateTime<Utc>>,
    pub terms: ContractTerm,
    /// Position in the add time series. Starts at 1.
    pub add_index: u64,
    /// Position in the settle time series. Starts at 1, zero until settled.
    pub settle_index: u64,
    /// Amount accepted at settlement. May exceed `terms.value`.
    pub amt_paid: MilliSatoshi,
}

impl Default for Invoice {
    fn default() -> Self {
        Self {
            memo: Vec::new(),
            receipt: Vec::new(),
            payment_request: Vec::new(),
            creation_date: DateTime::<Utc>::UNIX_EPOCH,
            settle_date: None,
            terms: ContractTerm::default(),
            add_index: 0,
            settle_index: 0,
            amt_paid: MilliSatoshi::default(),
        }
    }
}

impl Invoice {
    /// Invoice whose preimage is known at creation.
    pub fn with_preimage(
        preimage: Preimage,
        value: MilliSatoshi,
        creation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            creation_date,
            terms: ContractTerm {
                payment_preimage: preimage,
                value,
                ..ContractTerm::default()
            },
            ..Self::default()
        }
    }

    /// Invoice locked to a hash whose preimage is revealed later.
    pub fn with_external_hash(
        payment_hash: Hash,
        value: MilliSatoshi,
        creation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            creation_date,
            terms: ContractTerm {
                external_preimage: true,
                payment_hash,
                value,
                ..ContractTerm::default()
            },
            ..Self::default()
        }
    }

    /// Effective payment hash.
    ///
    /// Derived from the preimage for local invoices; the stored hash is only
    /// trusted for external-preimage invoices.
    pub fn payment_hash(&self) -> Result<Hash, LedgerError> {
        if self.terms.external_preimage {
            if self.terms.payment_hash == ZERO_HASH {
                return Err(LedgerError::MissingPreimageOrHash {
                    external_preimage: true,
                });
            }
            return Ok(self.terms.payment_hash);
        }

        if self.terms.payment_preimage == ZERO_PREIMAGE {
            return Err(LedgerError::MissingPreimageOrHash {
                external_preimage: false,
            });
        }
        Ok(Sha256::digest(self.terms.payment_preimage).into())
    }

    /// External invoice still waiting for its preimage.
    pub fn is_pending_preimage(&self) -> bool {
        self.terms.external_preimage && self.terms.payment_preimage == ZERO_PREIMAGE
    }

    pub fn is_settled(&self) -> bool {
        self.terms.settled
    }
}

/// Paginated query over the add-index time series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceQuery {
    /// Add index to start after (forward) or before (reversed).
    pub index_offset: u64,
    /// Maximum number of invoices to return.
    pub num_max_invoices: u64,
    /// Skip settled invoices.
    pub pending_only: bool,
    /// Walk backwards from `index_offset`.
    pub reversed: bool,
}

/// Response to an [`InvoiceQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSlice {
    /// The query that produced this slice.
    pub query: InvoiceQuery,
    /// Matching invoices in ascending add-index order.
    pub invoices: Vec<Invoice>,
    /// Add index of the first invoice, 0 if empty.
    pub first_index_offset: u64,
    /// Add index of the last invoice, 0 if empty.
    pub last_index_offset: u64,
}
