use canopy_types::{CanopyError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CanopyError),

    #[error("store error: {0}")]
    Lmdb(#[from] canopy_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("blocking task failed: {0}")]
    Join(String),
}

impl ServiceError {
    /// The domain failure kind, if this error came out of a core operation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Core(e) => Some(e.kind()),
            _ => None,
        }
    }
}
