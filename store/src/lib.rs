//! Abstract storage traits for canopy.
//!
//! Every storage backend (LMDB, in-memory for testing) implements [`Store`]
//! and [`StoreTxn`]. The rest of the codebase depends only on the traits and
//! reaches rows through the generic [`Repository`].

pub mod error;
pub mod record;
pub mod repository;
pub mod schema;

pub use error::StoreError;
pub use record::{Record, Table, UniqueKey};
pub use repository::{CasOutcome, Repository};
pub use schema::{EntityRecord, TokenRecord, TransferRecord, TrustRecord, WalletRecord};

/// Byte-level access to the tables inside one transaction.
///
/// Rows are keyed by their `u64` id. Unique indexes map an
/// `(index, value)` pair to the id of the row holding it.
pub trait StoreTxn {
    fn get(&self, table: Table, id: u64) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&mut self, table: Table, id: u64, bytes: &[u8]) -> Result<(), StoreError>;

    /// All rows of a table, ascending by id.
    fn scan(&self, table: Table) -> Result<Vec<(u64, Vec<u8>)>, StoreError>;

    /// Reserve the next id for a table. Ids start at 1 and are never reused.
    fn next_id(&mut self, table: Table) -> Result<u64, StoreError>;

    fn get_unique(&self, key: &UniqueKey) -> Result<Option<u64>, StoreError>;

    fn put_unique(&mut self, key: &UniqueKey, id: u64) -> Result<(), StoreError>;
}

/// A transactional record store.
///
/// `write` transactions are serialized by the backend: two concurrent writers
/// never observe each other's half-applied state, so a read-check-update
/// inside one `write` call is atomic.
pub trait Store: Send + Sync {
    /// Run `f` against a consistent read snapshot.
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreTxn) -> Result<T, E>,
        E: From<StoreError>;

    /// Run `f` in a write transaction. Commits iff `f` returns `Ok`; on `Err`
    /// every write made by `f` is discarded.
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTxn) -> Result<T, E>,
        E: From<StoreError>;
}
