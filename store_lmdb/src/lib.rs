//! LMDB storage backend for canopy.
//!
//! Implements [`canopy_store::Store`] using the `heed` LMDB bindings. Each
//! logical table maps to one LMDB database within a single environment, with
//! two auxiliary databases: `unique` (unique-key index) and `meta` (id
//! sequences, schema version).
//!
//! LMDB admits a single writer at a time. Every `Store::write` call is one
//! LMDB write transaction, so compare-and-set on a row is linearizable
//! across threads without any application-level locking.

pub mod environment;
pub mod error;
pub mod migration;
pub mod txn;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
