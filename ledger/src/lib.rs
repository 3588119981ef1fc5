//! Token ledger and transfer/claim workflow.
//!
//! The [`TokenLedger`] records which wallet holds each token and how tokens
//! group into lineage trees. It has no public way to move a token: ownership
//! changes only when [`TransferWorkflow::claim`] completes a pending
//! transfer, inside the same write transaction that marks it claimed.

pub mod lookup;
pub mod token;
pub mod transfer;

pub use lookup::{open_transfer_for, token_by_id, tokens_in_wallet, transfer_by_id};
pub use token::TokenLedger;
pub use transfer::TransferWorkflow;
