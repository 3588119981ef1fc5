//! Declaring a row shape.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// The logical tables of the custody core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Entity,
    Wallet,
    EntityTrust,
    Token,
    Transfer,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Entity,
        Table::Wallet,
        Table::EntityTrust,
        Table::Token,
        Table::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Entity => "entity",
            Table::Wallet => "wallet",
            Table::EntityTrust => "entity_trust",
            Table::Token => "token",
            Table::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that must be unique across a table, e.g. `wallet.name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    pub index: &'static str,
    pub value: Vec<u8>,
}

impl UniqueKey {
    pub fn new(index: &'static str, value: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            value: value.into(),
        }
    }

    /// Flat byte encoding `index ++ 0x00 ++ value`, used as a backend key.
    pub fn encode(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.index.len() + 1 + self.value.len());
        key.extend_from_slice(self.index.as_bytes());
        key.push(0);
        key.extend_from_slice(&self.value);
        key
    }
}

/// A row type persisted in one [`Table`].
///
/// Unique keys are written once at creation and treated as immutable
/// afterwards; `update` never re-indexes them.
pub trait Record: Clone + Serialize + DeserializeOwned {
    const TABLE: Table;

    type Id: Copy + From<u64> + Into<u64> + fmt::Display;

    fn id(&self) -> Self::Id;

    fn set_id(&mut self, id: Self::Id);

    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }
}
