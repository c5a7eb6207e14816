//! Core contracts for ratebench.
//!
//! This crate contains:
//! - Canonical domain models (rate rows, lookup keys, resolved matches)
//! - The `RateStore` query contract the storage layer implements
//! - The rate-resolution algorithm (match precedence and fallback)
//! - Audit-log record shapes

pub mod error;
pub mod model;
pub mod resolve;
pub mod store;

pub use error::ValidationError;
pub use model::{
    LookupKey, LookupLogEntry, MatchType, Percentiles, RateRow, ResolvedMatch,
};
pub use resolve::{resolve_lookup, LookupOutcome};
pub use store::{RateStore, StoreError};
