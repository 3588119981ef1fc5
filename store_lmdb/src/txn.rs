//! `StoreTxn` over LMDB read and write transactions.
//!
//! Row keys are the big-endian id, so LMDB's lexicographic order is id order.
//! Unique-index keys use [`UniqueKey::encode`]; values are big-endian ids.

use heed::{RoTxn, RwTxn};

use canopy_store::{StoreError, StoreTxn, Table, UniqueKey};

use crate::environment::LmdbEnvironment;
use crate::error::backend;
use crate::LmdbError;

fn sequence_key(table: Table) -> Vec<u8> {
    format!("seq:{}", table.as_str()).into_bytes()
}

fn decode_id(bytes: &[u8], what: &str) -> Result<u64, StoreError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization(format!("{what} has unexpected byte length")))?;
    Ok(u64::from_be_bytes(arr))
}

fn read_row(
    env: &LmdbEnvironment,
    txn: &RoTxn,
    table: Table,
    id: u64,
) -> Result<Option<Vec<u8>>, StoreError> {
    let db = env.table(table)?;
    let val = db.get(txn, &id.to_be_bytes()).map_err(backend)?;
    Ok(val.map(<[u8]>::to_vec))
}

fn scan_rows(
    env: &LmdbEnvironment,
    txn: &RoTxn,
    table: Table,
) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
    let db = env.table(table)?;
    let mut rows = Vec::new();
    for item in db.iter(txn).map_err(backend)? {
        let (key, val) = item.map_err(backend)?;
        rows.push((decode_id(key, "row key")?, val.to_vec()));
    }
    Ok(rows)
}

fn read_unique(
    env: &LmdbEnvironment,
    txn: &RoTxn,
    key: &UniqueKey,
) -> Result<Option<u64>, StoreError> {
    match env.unique_db.get(txn, &key.encode()).map_err(backend)? {
        Some(bytes) => Ok(Some(decode_id(bytes, "unique index value")?)),
        None => Ok(None),
    }
}

/// A read-only snapshot. Every write method fails with `StoreError::ReadOnly`.
pub struct LmdbReadTxn<'e> {
    env: &'e LmdbEnvironment,
    txn: RoTxn<'e>,
}

impl<'e> LmdbReadTxn<'e> {
    pub(crate) fn new(env: &'e LmdbEnvironment, txn: RoTxn<'e>) -> Self {
        Self { env, txn }
    }
}

impl StoreTxn for LmdbReadTxn<'_> {
    fn get(&self, table: Table, id: u64) -> Result<Option<Vec<u8>>, StoreError> {
        read_row(self.env, &self.txn, table, id)
    }

    fn put(&mut self, _table: Table, _id: u64, _bytes: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn scan(&self, table: Table) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        scan_rows(self.env, &self.txn, table)
    }

    fn next_id(&mut self, _table: Table) -> Result<u64, StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn get_unique(&self, key: &UniqueKey) -> Result<Option<u64>, StoreError> {
        read_unique(self.env, &self.txn, key)
    }

    fn put_unique(&mut self, _key: &UniqueKey, _id: u64) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }
}

/// The single LMDB write transaction. Aborted on drop unless committed.
pub struct LmdbWriteTxn<'e> {
    env: &'e LmdbEnvironment,
    txn: RwTxn<'e>,
}

impl<'e> LmdbWriteTxn<'e> {
    pub(crate) fn new(env: &'e LmdbEnvironment, txn: RwTxn<'e>) -> Self {
        Self { env, txn }
    }

    pub(crate) fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(backend)
    }
}

impl StoreTxn for LmdbWriteTxn<'_> {
    fn get(&self, table: Table, id: u64) -> Result<Option<Vec<u8>>, StoreError> {
        read_row(self.env, &self.txn, table, id)
    }

    fn put(&mut self, table: Table, id: u64, bytes: &[u8]) -> Result<(), StoreError> {
        let db = self.env.table(table)?;
        db.put(&mut self.txn, &id.to_be_bytes(), bytes).map_err(backend)
    }

    fn scan(&self, table: Table) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        scan_rows(self.env, &self.txn, table)
    }

    fn next_id(&mut self, table: Table) -> Result<u64, StoreError> {
        let key = sequence_key(table);
        let last = match self.env.meta_db.get(&self.txn, &key).map_err(backend)? {
            Some(bytes) => decode_id(bytes, "sequence value")?,
            None => 0,
        };
        let next = last + 1;
        self.env
            .meta_db
            .put(&mut self.txn, &key, &next.to_be_bytes())
            .map_err(backend)?;
        Ok(next)
    }

    fn get_unique(&self, key: &UniqueKey) -> Result<Option<u64>, StoreError> {
        read_unique(self.env, &self.txn, key)
    }

    fn put_unique(&mut self, key: &UniqueKey, id: u64) -> Result<(), StoreError> {
        self.env
            .unique_db
            .put(&mut self.txn, &key.encode(), &id.to_be_bytes())
            .map_err(backend)
    }
}
