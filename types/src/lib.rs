//! Fundamental types for the canopy custody core.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! row identifiers, the closed enumerations of the trust and transfer state
//! machines, the error taxonomy, and timestamps.

pub mod error;
pub mod ids;
pub mod state;
pub mod time;

pub use error::{CanopyError, ErrorKind};
pub use ids::{EntityId, TokenId, TransferId, TreeId, TrustId, WalletId};
pub use state::{Capability, TransferState, TransferType, TrustRequestType, TrustState, TrustType};
pub use time::{Clock, SystemClock, Timestamp};
