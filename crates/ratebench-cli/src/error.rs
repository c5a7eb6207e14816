use thiserror::Error;

use ratebench_core::{StoreError, ValidationError};
use ratebench_ingest::IngestError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Configuration(_) => 3,
            Self::Ingest(_) => 4,
            Self::Store(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
