use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt value: {0}")]
    Serialization(String),

    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("unknown migration: {from} -> {to}")]
    UnknownMigration { from: u32, to: u32 },
}

impl From<LmdbError> for canopy_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Serialization(msg) => canopy_store::StoreError::Corruption(msg),
            other => canopy_store::StoreError::Backend(other.to_string()),
        }
    }
}

/// Shorthand used at every heed call site.
pub(crate) fn backend(e: heed::Error) -> canopy_store::StoreError {
    LmdbError::Heed(e).into()
}
