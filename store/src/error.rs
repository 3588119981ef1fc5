use canopy_types::CanopyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("write attempted in a read-only transaction")]
    ReadOnly,

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Only a missing row or a unique-key collision carry domain meaning.
/// Everything else is an infrastructure fault and must not read as `NotFound`.
impl From<StoreError> for CanopyError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => CanopyError::NotFound(what),
            StoreError::Duplicate(what) => CanopyError::Conflict(format!("{what} already exists")),
            other => CanopyError::Infrastructure(other.to_string()),
        }
    }
}
