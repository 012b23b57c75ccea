//! # Ports Layer
//!
//! Defines the port traits for the Invoice Ledger subsystem.
//!
//! ## Hexagonal Architecture
//!
//! - `inbound.rs` - Driving ports (API exposed to the RPC and payment layers)
//! - `outbound.rs` - Driven ports (transactional store, clock)

pub mod inbound;
pub mod outbound;
