//! Canopy custody service.
//!
//! Wires the directory, trust graph, authorization evaluator, token ledger
//! and transfer workflow around one explicitly owned store handle. There is
//! no global state: whoever builds a [`Custody`] owns the store's lifetime
//! and ends it with [`Custody::shutdown`].

pub mod config;
pub mod custody;
pub mod error;
pub mod logging;

pub use config::ServiceConfig;
pub use custody::{Custody, WalletSummary};
pub use error::ServiceError;
pub use logging::{init_logging, LogFormat};
