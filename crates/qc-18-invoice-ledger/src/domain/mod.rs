//! # Domain Layer
//!
//! Pure domain logic for the Invoice Ledger subsystem.
//!
//! ## Modules
//!
//! - `entities` - Invoice, ContractTerm, query/slice types
//! - `codec` - Binary record layout for stored invoices
//! - `keys` - Bucket names and big-endian key encodings
//! - `validation` - Field size ceilings
//! - `config` - Ledger configuration
//! - `errors` - Domain error types

pub mod codec;
pub mod config;
pub mod entities;
pub mod errors;
pub mod keys;
pub mod validation;
