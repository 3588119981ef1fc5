use std::sync::Arc;

use canopy_authz::{entity_controls_in, ControlGround};
use canopy_directory::{entity_by_id, wallet_by_id};
use canopy_store::{CasOutcome, Repository, Store, StoreTxn, TransferRecord};
use canopy_types::{
    CanopyError, Capability, Clock, EntityId, Timestamp, TokenId, TransferId, TransferState,
    TransferType, WalletId,
};

use crate::lookup::{open_transfer_for, token_by_id, transfer_by_id};
use crate::token::reassign;

/// The pending → completed | voided state machine for moving one token.
///
/// Every operation checks authority and applies its change inside one write
/// transaction, so a trust edge cancelled concurrently either lands before
/// the check or after the commit, never in between.
pub struct TransferWorkflow<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for TransferWorkflow<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: Store> TransferWorkflow<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Open a transfer of `token_id` from its current wallet to
    /// `destination_wallet`.
    ///
    /// The sender must own the holding wallet or control it with `send`.
    /// At most one transfer per token may be pending at a time; a second
    /// attempt fails `Conflict` until the first is claimed or voided.
    pub fn create_transfer(
        &self,
        token_id: TokenId,
        sender: EntityId,
        destination_wallet: WalletId,
    ) -> Result<TransferRecord, CanopyError> {
        let now = self.clock.now();
        let result = self.store.write(|txn| {
            entity_by_id(txn, sender)?;
            let token = token_by_id(txn, token_id)?;
            let destination = wallet_by_id(txn, destination_wallet)?;
            if token.owner_wallet_id == destination.id {
                return Err(CanopyError::InvalidArgument(format!(
                    "token {token_id} is already held by wallet {}",
                    destination.name
                )));
            }
            let ground = authorize(txn, sender, token.owner_wallet_id, Capability::Send)?;
            if let Some(open) = open_transfer_for(txn, token_id)? {
                return Err(CanopyError::Conflict(format!(
                    "token {token_id} already has pending transfer {}",
                    open.id
                )));
            }
            let row = Repository::create(
                txn,
                TransferRecord {
                    id: TransferId::new(0),
                    token_id,
                    source_entity_id: sender,
                    destination_entity_id: destination.entity_id,
                    source_wallet_id: token.owner_wallet_id,
                    destination_wallet_id: destination.id,
                    transfer_type: TransferType::Send,
                    state: TransferState::Pending,
                    active: true,
                    claim: false,
                    created_at: now,
                    closed_at: None,
                },
            )?;
            Ok((row, ground))
        });
        match &result {
            Ok((row, ground)) => tracing::info!(
                transfer = %row.id,
                token = %token_id,
                sender = %sender,
                from = %row.source_wallet_id,
                to = %row.destination_wallet_id,
                ?ground,
                "transfer created"
            ),
            Err(e) => tracing::warn!(token = %token_id, sender = %sender, error = %e, "transfer refused"),
        }
        result.map(|(row, _)| row)
    }

    /// Pending transfers addressed to `destination`, ascending by id.
    pub fn get_pending_transfers(
        &self,
        destination: EntityId,
    ) -> Result<Vec<TransferRecord>, CanopyError> {
        self.store.read(|txn| {
            entity_by_id(txn, destination)?;
            Ok(Repository::<TransferRecord>::find(txn, |t| {
                t.destination_entity_id == destination && t.state == TransferState::Pending
            })?)
        })
    }

    pub fn get(&self, id: TransferId) -> Result<TransferRecord, CanopyError> {
        self.store.read(|txn| transfer_by_id(txn, id))
    }

    /// Complete a pending transfer and move the token to the destination.
    ///
    /// The claimer must own the destination wallet or control it with
    /// `manage`. Marking the transfer and reassigning the token commit
    /// together or not at all.
    pub fn claim(&self, id: TransferId, claimer: EntityId) -> Result<TransferRecord, CanopyError> {
        let now = self.clock.now();
        let result = self.store.write(|txn| {
            let transfer = transfer_by_id(txn, id)?;
            entity_by_id(txn, claimer)?;
            authorize(txn, claimer, transfer.destination_wallet_id, Capability::Manage)?;
            if transfer.state != TransferState::Pending {
                return Err(not_pending(&transfer));
            }
            let token = token_by_id(txn, transfer.token_id)?;
            if token.owner_wallet_id != transfer.source_wallet_id {
                return Err(CanopyError::Conflict(format!(
                    "token {} left wallet {} after transfer {id} was opened",
                    token.id, transfer.source_wallet_id
                )));
            }
            let claimed = close(txn, id, TransferState::Completed, now)?;
            reassign(txn, claimed.token_id, claimed.destination_wallet_id)?;
            Ok(claimed)
        });
        match &result {
            Ok(t) => tracing::info!(
                transfer = %id,
                token = %t.token_id,
                claimer = %claimer,
                wallet = %t.destination_wallet_id,
                "transfer claimed"
            ),
            Err(e) => tracing::warn!(transfer = %id, claimer = %claimer, error = %e, "claim refused"),
        }
        result
    }

    /// Cancel a pending transfer. The token stays where it is.
    ///
    /// Requires `deduct` control over the source wallet, which its owner and
    /// the owners of its ancestor wallets always hold. Opening the transfer
    /// under delegated `send` trust confers no right to void it.
    pub fn void(&self, id: TransferId, acting: EntityId) -> Result<TransferRecord, CanopyError> {
        let now = self.clock.now();
        let result = self.store.write(|txn| {
            let transfer = transfer_by_id(txn, id)?;
            entity_by_id(txn, acting)?;
            authorize(txn, acting, transfer.source_wallet_id, Capability::Deduct)?;
            if transfer.state != TransferState::Pending {
                return Err(not_pending(&transfer));
            }
            close(txn, id, TransferState::Voided, now)
        });
        match &result {
            Ok(t) => tracing::info!(transfer = %id, token = %t.token_id, acting = %acting, "transfer voided"),
            Err(e) => tracing::warn!(transfer = %id, acting = %acting, error = %e, "void refused"),
        }
        result
    }
}

fn authorize(
    txn: &dyn StoreTxn,
    acting: EntityId,
    wallet: WalletId,
    capability: Capability,
) -> Result<ControlGround, CanopyError> {
    entity_controls_in(txn, acting, wallet, capability)?.ok_or_else(|| {
        CanopyError::Forbidden(format!(
            "entity {acting} has no {capability} authority over wallet {wallet}"
        ))
    })
}

/// Move a pending transfer into a terminal state, compare-and-set on `pending`.
fn close(
    txn: &mut dyn StoreTxn,
    id: TransferId,
    state: TransferState,
    now: Timestamp,
) -> Result<TransferRecord, CanopyError> {
    let outcome = Repository::<TransferRecord>::compare_and_set(
        txn,
        id,
        |t| t.state == TransferState::Pending,
        |t| {
            t.state = state;
            t.active = false;
            t.claim = state == TransferState::Completed;
            t.closed_at = Some(now);
        },
    )?;
    match outcome {
        CasOutcome::Applied(row) => Ok(row),
        CasOutcome::Mismatch(row) => Err(not_pending(&row)),
        CasOutcome::Missing => Err(CanopyError::NotFound(format!("transfer {id} does not exist"))),
    }
}

fn not_pending(row: &TransferRecord) -> CanopyError {
    CanopyError::Conflict(format!("transfer {} is already {}", row.id, row.state))
}
