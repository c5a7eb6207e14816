use thiserror::Error;

/// Validation errors for lookup request construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one procedure code is required")]
    EmptyCodeList,

    #[error("geozip must be an integer: '{value}'")]
    InvalidGeozip { value: String },
}
