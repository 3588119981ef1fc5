//! Error taxonomy shared by every core operation.

use thiserror::Error;

/// The failure categories a transport layer maps to status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Forbidden,
    Conflict,
    Infrastructure,
}

/// Common error type for core operations.
///
/// Core operations never retry and never downgrade a failure: whatever kind
/// is raised reaches the caller intact.
#[derive(Debug, Error)]
pub enum CanopyError {
    /// Malformed input: blank name, unrecognised enum value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The actor lacks hierarchical or delegated authority.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A state-machine precondition failed or a unique key collided.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store could not be reached or returned garbage.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl CanopyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }
}
