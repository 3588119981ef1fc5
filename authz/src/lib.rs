//! Authorization evaluator.
//!
//! Decides whether an acting wallet (or entity) may exercise a capability
//! over a target wallet. Grounds are evaluated in order and the first match
//! wins:
//!
//! 1. **Self**: a wallet controls itself.
//! 2. **Hierarchy**: an ancestor in the wallet forest controls every
//!    descendant, for every capability, with no trust row involved.
//! 3. **Delegation**: the target's owner has a `trusted` relationship of the
//!    matching type pointing at the actor's owner.
//!
//! Evaluation is read-only. The `*_in` functions take the caller's
//! transaction so a workflow can authorize and mutate against one snapshot.

pub mod evaluator;

pub use evaluator::{entity_controls_in, wallet_controls_in, Authorizer, ControlGround};
