use thiserror::Error;

use crate::model::RateRow;

/// Errors surfaced by a rate store implementation.
///
/// `Unavailable` maps to a server-configuration failure (the backing store is
/// missing), distinct from a per-code no-match which is a normal result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate store unavailable: {0}")]
    Unavailable(String),

    #[error("rate store query failed: {0}")]
    Query(String),
}

/// Exact-match query contract the resolver requires from the storage layer.
///
/// Both methods scope to a single `(geozip, code)` pair; `product_filter`
/// narrows the result to one product line when the caller supplied one.
pub trait RateStore {
    /// Rows whose modifier equals `modifier` exactly.
    fn modifier_rates(
        &self,
        geozip: i64,
        code: &str,
        modifier: &str,
        product_filter: Option<&str>,
    ) -> Result<Vec<RateRow>, StoreError>;

    /// Rows with no modifier on file (null or empty).
    fn base_rates(
        &self,
        geozip: i64,
        code: &str,
        product_filter: Option<&str>,
    ) -> Result<Vec<RateRow>, StoreError>;
}
