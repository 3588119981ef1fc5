//! Transaction-scoped token and transfer queries.

use canopy_directory::wallet_by_id;
use canopy_store::{Repository, StoreTxn, TokenRecord, TransferRecord};
use canopy_types::{CanopyError, TokenId, TransferId, WalletId};

pub fn token_by_id(txn: &dyn StoreTxn, id: TokenId) -> Result<TokenRecord, CanopyError> {
    Repository::<TokenRecord>::get(txn, id)?
        .ok_or_else(|| CanopyError::NotFound(format!("token {id} does not exist")))
}

/// Tokens currently held in `wallet_id`, ascending by id.
pub fn tokens_in_wallet(
    txn: &dyn StoreTxn,
    wallet_id: WalletId,
) -> Result<Vec<TokenRecord>, CanopyError> {
    wallet_by_id(txn, wallet_id)?;
    Ok(Repository::<TokenRecord>::find(txn, |t| t.owner_wallet_id == wallet_id)?)
}

pub fn transfer_by_id(txn: &dyn StoreTxn, id: TransferId) -> Result<TransferRecord, CanopyError> {
    Repository::<TransferRecord>::get(txn, id)?
        .ok_or_else(|| CanopyError::NotFound(format!("transfer {id} does not exist")))
}

/// The pending, active transfer of `token`, if one is outstanding.
pub fn open_transfer_for(
    txn: &dyn StoreTxn,
    token: TokenId,
) -> Result<Option<TransferRecord>, CanopyError> {
    Ok(Repository::<TransferRecord>::find_first(txn, |t| {
        t.token_id == token && t.is_open()
    })?)
}
