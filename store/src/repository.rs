//! Generic typed access to any [`Record`] table.
//!
//! One implementation of get / create / update / compare-and-set serves every
//! row shape; callers pick the table through the type parameter:
//!
//! ```ignore
//! let wallet = Repository::<WalletRecord>::get(txn, wallet_id)?;
//! ```

use std::marker::PhantomData;

use crate::record::{Record, UniqueKey};
use crate::{StoreError, StoreTxn};

/// Result of [`Repository::compare_and_set`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CasOutcome<R> {
    /// The row matched the expectation and now holds the new value.
    Applied(R),
    /// No row with that id.
    Missing,
    /// The row exists but failed the expectation; it is returned unchanged.
    Mismatch(R),
}

/// Stateless typed accessor for the table of `R`.
pub struct Repository<R>(PhantomData<R>);

impl<R: Record> Repository<R> {
    pub fn get(txn: &dyn StoreTxn, id: R::Id) -> Result<Option<R>, StoreError> {
        match txn.get(R::TABLE, id.into())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_by_unique(txn: &dyn StoreTxn, key: &UniqueKey) -> Result<Option<R>, StoreError> {
        match txn.get_unique(key)? {
            Some(id) => {
                let row = Self::get(txn, R::Id::from(id))?;
                // A dangling index entry means the index and the table disagree.
                row.map(Some).ok_or_else(|| {
                    StoreError::Corruption(format!(
                        "unique index {} points at missing {} {}",
                        key.index,
                        R::TABLE,
                        id
                    ))
                })
            }
            None => Ok(None),
        }
    }

    /// Insert a new row. The id is assigned here; whatever id `record` carries
    /// is overwritten. Fails with `Duplicate` if any unique key is taken.
    pub fn create(txn: &mut dyn StoreTxn, mut record: R) -> Result<R, StoreError> {
        let keys = record.unique_keys();
        for key in &keys {
            if txn.get_unique(key)?.is_some() {
                return Err(StoreError::Duplicate(format!(
                    "{} {}",
                    key.index,
                    String::from_utf8_lossy(&key.value)
                )));
            }
        }
        let id = txn.next_id(R::TABLE)?;
        record.set_id(R::Id::from(id));
        let bytes = bincode::serialize(&record)?;
        txn.put(R::TABLE, id, &bytes)?;
        for key in &keys {
            txn.put_unique(key, id)?;
        }
        Ok(record)
    }

    /// Overwrite an existing row. Fails with `NotFound` if it does not exist.
    pub fn update(txn: &mut dyn StoreTxn, record: &R) -> Result<(), StoreError> {
        let id: u64 = record.id().into();
        if txn.get(R::TABLE, id)?.is_none() {
            return Err(StoreError::NotFound(format!("{} {}", R::TABLE, id)));
        }
        let bytes = bincode::serialize(record)?;
        txn.put(R::TABLE, id, &bytes)
    }

    /// Apply `change` to the row iff `expected` holds for its current value.
    ///
    /// Inside a write transaction this is the single atomic step that decides
    /// which of two racing callers wins a state transition.
    pub fn compare_and_set<P, F>(
        txn: &mut dyn StoreTxn,
        id: R::Id,
        expected: P,
        change: F,
    ) -> Result<CasOutcome<R>, StoreError>
    where
        P: FnOnce(&R) -> bool,
        F: FnOnce(&mut R),
    {
        let Some(mut row) = Self::get(txn, id)? else {
            return Ok(CasOutcome::Missing);
        };
        if !expected(&row) {
            return Ok(CasOutcome::Mismatch(row));
        }
        change(&mut row);
        row.set_id(id);
        let bytes = bincode::serialize(&row)?;
        txn.put(R::TABLE, id.into(), &bytes)?;
        Ok(CasOutcome::Applied(row))
    }

    /// All rows matching `pred`, ascending by id.
    pub fn find<P>(txn: &dyn StoreTxn, pred: P) -> Result<Vec<R>, StoreError>
    where
        P: Fn(&R) -> bool,
    {
        let mut rows = Vec::new();
        for (_id, bytes) in txn.scan(R::TABLE)? {
            let row: R = bincode::deserialize(&bytes)?;
            if pred(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// First row matching `pred`, by ascending id.
    pub fn find_first<P>(txn: &dyn StoreTxn, pred: P) -> Result<Option<R>, StoreError>
    where
        P: Fn(&R) -> bool,
    {
        for (_id, bytes) in txn.scan(R::TABLE)? {
            let row: R = bincode::deserialize(&bytes)?;
            if pred(&row) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    pub fn count(txn: &dyn StoreTxn) -> Result<u64, StoreError> {
        Ok(txn.scan(R::TABLE)?.len() as u64)
    }
}
