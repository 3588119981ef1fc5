//! Entity/wallet directory.
//!
//! Owns the identity side of the custody core: which entities exist, which
//! wallets they own, and the static parent → sub-wallet forest. The forest is
//! built bottom-up (a parent must exist before its child) and never rewired,
//! so it cannot contain a cycle.
//!
//! The free functions in [`lookup`] run inside a caller's transaction; the
//! trust graph, the authorization evaluator and the transfer workflow use
//! them so their checks see the same snapshot as their writes.

pub mod directory;
pub mod lookup;

pub use directory::{insert_managed_wallet, Directory};
pub use lookup::{
    ancestor_chain, entity_by_id, validate_name, wallet_by_id, wallet_by_name, wallets_of_entity,
};
