//! Trust graph engine.
//!
//! A trust relationship is a directed, typed edge from an originating entity
//! to a target entity. Its lifecycle:
//!
//! ```text
//!             accept (target)
//! requested ──────────────────► trusted
//!     │                           │
//!     │ cancel (originator)       │ cancel (originator)
//!     ├──────────────────────────►├──► cancelled_by_originator
//!     │ cancel (target)           │ cancel (target)
//!     └──────────────────────────►└──► cancelled_by_actor
//! ```
//!
//! Rows are never deleted or revived; re-establishing trust after a
//! cancellation takes a fresh `request()` and produces a new row.

pub mod filter;
pub mod graph;
pub mod lookup;

pub use filter::TrustFilter;
pub use graph::TrustGraph;
pub use lookup::{relationships_of, trust_by_id, trusted_edge};
