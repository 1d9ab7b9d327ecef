//! The Logit ledger engine.
//!
//! [`Ledger`] owns the write path for driver records: it validates every
//! submission against the chain it extends, moves the per-driver active
//! pointer atomically, and attaches notes. Storage and geocoding are
//! injected through the traits in [`logit_core`].

pub mod config;
pub mod error;
pub mod notes;
pub mod pointer;
pub mod reconcile;
pub mod service;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use service::{Ledger, LedgerStore};

#[cfg(test)]
mod tests;
