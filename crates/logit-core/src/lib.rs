//! Core types and trait definitions for the Logit driver ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The store, engine and API crates depend on it; it depends on nothing
//! proprietary.

pub mod auth;
pub mod error;
pub mod external;
pub mod note;
pub mod policy;
pub mod record;
pub mod store;
pub mod validate;

pub use error::{ConflictKind, Error, FieldError, Result, Violation};
