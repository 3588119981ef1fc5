//! Nullable store: thread-safe in-memory storage for testing.
//!
//! Mirrors the LMDB backend's transaction semantics: writers are serialized
//! by one mutex, and a write closure works on a staged copy of the tables
//! that replaces the live copy only when the closure returns `Ok`.

use canopy_store::{Store, StoreError, StoreTxn, Table, UniqueKey};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Clone, Debug, Default)]
struct Tables {
    rows: HashMap<Table, BTreeMap<u64, Vec<u8>>>,
    unique: HashMap<Vec<u8>, u64>,
    sequences: HashMap<Table, u64>,
}

impl Tables {
    fn get(&self, table: Table, id: u64) -> Option<Vec<u8>> {
        self.rows.get(&table).and_then(|t| t.get(&id)).cloned()
    }

    fn scan(&self, table: Table) -> Vec<(u64, Vec<u8>)> {
        self.rows
            .get(&table)
            .map(|t| t.iter().map(|(id, bytes)| (*id, bytes.clone())).collect())
            .unwrap_or_default()
    }
}

/// An in-memory [`Store`] for testing.
/// Thread-safe for use from many threads or tokio's blocking pool.
#[derive(Debug, Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
    failing: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every transaction fails with a backend error, as an
    /// unreachable database would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store is set to fail".to_string()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("null store mutex poisoned".to_string()))
    }
}

impl Store for NullStore {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let guard = self.lock()?;
        let txn = NullReadTxn { tables: &guard };
        f(&txn)
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let out = f(&mut NullWriteTxn {
            tables: &mut staged,
        })?;
        *guard = staged;
        Ok(out)
    }
}

struct NullReadTxn<'a> {
    tables: &'a Tables,
}

impl StoreTxn for NullReadTxn<'_> {
    fn get(&self, table: Table, id: u64) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.get(table, id))
    }

    fn put(&mut self, _table: Table, _id: u64, _bytes: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn scan(&self, table: Table) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        Ok(self.tables.scan(table))
    }

    fn next_id(&mut self, _table: Table) -> Result<u64, StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn get_unique(&self, key: &UniqueKey) -> Result<Option<u64>, StoreError> {
        Ok(self.tables.unique.get(&key.encode()).copied())
    }

    fn put_unique(&mut self, _key: &UniqueKey, _id: u64) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }
}

struct NullWriteTxn<'a> {
    tables: &'a mut Tables,
}

impl StoreTxn for NullWriteTxn<'_> {
    fn get(&self, table: Table, id: u64) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.get(table, id))
    }

    fn put(&mut self, table: Table, id: u64, bytes: &[u8]) -> Result<(), StoreError> {
        self.tables
            .rows
            .entry(table)
            .or_default()
            .insert(id, bytes.to_vec());
        Ok(())
    }

    fn scan(&self, table: Table) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        Ok(self.tables.scan(table))
    }

    fn next_id(&mut self, table: Table) -> Result<u64, StoreError> {
        let seq = self.tables.sequences.entry(table).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    fn get_unique(&self, key: &UniqueKey) -> Result<Option<u64>, StoreError> {
        Ok(self.tables.unique.get(&key.encode()).copied())
    }

    fn put_unique(&mut self, key: &UniqueKey, id: u64) -> Result<(), StoreError> {
        self.tables.unique.insert(key.encode(), id);
        Ok(())
    }
}
