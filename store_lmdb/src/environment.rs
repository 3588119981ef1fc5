//! LMDB environment setup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use canopy_store::{Store, StoreError, StoreTxn, Table};

use crate::error::backend;
use crate::migration::Migrator;
use crate::txn::{LmdbReadTxn, LmdbWriteTxn};
use crate::LmdbError;

/// One database per table plus `unique` and `meta`.
const MAX_DBS: u32 = Table::ALL.len() as u32 + 2;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    path: PathBuf,
    pub(crate) tables: HashMap<Table, Database<Bytes, Bytes>>,
    pub(crate) unique_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating every
    /// database and running schema migrations.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // its memory map is never handed out beyond the heed API.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut tables = HashMap::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(table.as_str()))?;
            tables.insert(table, db);
        }
        let unique_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("unique"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env,
            path: path.to_path_buf(),
            tables,
            unique_db,
            meta_db,
        };
        Migrator::run(&environment)?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    pub(crate) fn table(&self, table: Table) -> Result<Database<Bytes, Bytes>, StoreError> {
        self.tables
            .get(&table)
            .copied()
            .ok_or_else(|| StoreError::Corruption(format!("database for table {table} is not open")))
    }

    /// Number of rows per table.
    pub fn table_counts(&self) -> Result<Vec<(Table, u64)>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let mut counts = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            if let Some(db) = self.tables.get(&table) {
                counts.push((table, db.len(&rtxn)?));
            }
        }
        Ok(counts)
    }

    /// Flush the memory map to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}

impl Store for LmdbEnvironment {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let rtxn = self.env.read_txn().map_err(backend)?;
        let txn = LmdbReadTxn::new(self, rtxn);
        f(&txn)
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let wtxn = self.env.write_txn().map_err(backend)?;
        let mut txn = LmdbWriteTxn::new(self, wtxn);
        // Dropping `txn` on the error path aborts the LMDB transaction.
        let out = f(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }
}
