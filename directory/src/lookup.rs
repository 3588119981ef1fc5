//! Transaction-scoped directory queries.

use std::collections::HashSet;

use canopy_store::schema::WALLET_NAME_INDEX;
use canopy_store::{EntityRecord, Repository, StoreError, StoreTxn, UniqueKey, WalletRecord};
use canopy_types::{CanopyError, EntityId, WalletId};

/// Trim a caller-supplied name, rejecting empty or whitespace-only input.
pub fn validate_name<'a>(raw: &'a str, what: &str) -> Result<&'a str, CanopyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CanopyError::InvalidArgument(format!("{what} must not be blank")));
    }
    Ok(trimmed)
}

pub fn entity_by_id(txn: &dyn StoreTxn, id: EntityId) -> Result<EntityRecord, CanopyError> {
    Repository::<EntityRecord>::get(txn, id)?
        .ok_or_else(|| CanopyError::NotFound(format!("entity {id} does not exist")))
}

pub fn wallet_by_id(txn: &dyn StoreTxn, id: WalletId) -> Result<WalletRecord, CanopyError> {
    Repository::<WalletRecord>::get(txn, id)?
        .ok_or_else(|| CanopyError::NotFound(format!("wallet {id} does not exist")))
}

pub fn wallet_by_name(txn: &dyn StoreTxn, name: &str) -> Result<WalletRecord, CanopyError> {
    let key = UniqueKey::new(WALLET_NAME_INDEX, name.as_bytes());
    Repository::<WalletRecord>::get_by_unique(txn, &key)?
        .ok_or_else(|| CanopyError::NotFound(format!("can not find wallet named `{name}`")))
}

pub fn wallets_of_entity(
    txn: &dyn StoreTxn,
    entity: EntityId,
) -> Result<Vec<WalletRecord>, CanopyError> {
    Ok(Repository::<WalletRecord>::find(txn, |w| w.entity_id == entity)?)
}

/// The parent chain of `wallet`, nearest parent first, excluding `wallet`
/// itself. Empty for a top-level wallet.
///
/// A missing parent or a revisited wallet can only come from a damaged store
/// and is reported as corruption, never as `NotFound`.
pub fn ancestor_chain(txn: &dyn StoreTxn, wallet: WalletId) -> Result<Vec<WalletId>, CanopyError> {
    let start = wallet_by_id(txn, wallet)?;
    let mut chain = Vec::new();
    let mut seen = HashSet::from([start.id]);
    let mut next = start.parent_wallet_id;

    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            return Err(StoreError::Corruption(format!(
                "wallet {wallet} has a cyclic parent chain through {parent_id}"
            ))
            .into());
        }
        let parent = Repository::<WalletRecord>::get(txn, parent_id)?.ok_or_else(|| {
            StoreError::Corruption(format!("wallet {wallet} has missing ancestor {parent_id}"))
        })?;
        chain.push(parent.id);
        next = parent.parent_wallet_id;
    }
    Ok(chain)
}
