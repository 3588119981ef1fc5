//! The directory service.

use std::sync::Arc;

use canopy_store::{EntityRecord, Repository, Store, StoreTxn, WalletRecord};
use canopy_types::{CanopyError, Clock, EntityId, Timestamp, WalletId};

use crate::lookup::{
    ancestor_chain, entity_by_id, validate_name, wallet_by_id, wallet_by_name, wallets_of_entity,
};

/// Entities, wallets and the wallet forest.
pub struct Directory<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for Directory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: Store> Directory<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    // ── Entities ────────────────────────────────────────────────────────

    pub fn create_entity(&self, name: &str) -> Result<EntityRecord, CanopyError> {
        let name = validate_name(name, "entity name")?;
        let record = EntityRecord {
            id: EntityId::new(0),
            name: name.to_string(),
            created_at: self.clock.now(),
        };
        let entity = self
            .store
            .write(|txn| Ok::<_, CanopyError>(Repository::create(txn, record)?))?;
        tracing::info!(entity = %entity.id, name = %entity.name, "entity created");
        Ok(entity)
    }

    /// Rename an entity. The name is the only mutable entity attribute.
    pub fn rename_entity(&self, id: EntityId, name: &str) -> Result<EntityRecord, CanopyError> {
        let name = validate_name(name, "entity name")?;
        let entity = self.store.write(|txn| {
            let mut entity = entity_by_id(txn, id)?;
            entity.name = name.to_string();
            Repository::update(txn, &entity)?;
            Ok::<_, CanopyError>(entity)
        })?;
        tracing::info!(entity = %id, name = %entity.name, "entity renamed");
        Ok(entity)
    }

    pub fn get_entity(&self, id: EntityId) -> Result<EntityRecord, CanopyError> {
        self.store.read(|txn| entity_by_id(txn, id))
    }

    // ── Wallets ─────────────────────────────────────────────────────────

    /// Create a top-level wallet owned by `entity_id`.
    pub fn create_wallet(
        &self,
        entity_id: EntityId,
        name: &str,
    ) -> Result<WalletRecord, CanopyError> {
        let name = validate_name(name, "wallet name")?;
        let now = self.clock.now();
        let wallet = self.store.write(|txn| {
            entity_by_id(txn, entity_id)?;
            let record = WalletRecord {
                id: WalletId::new(0),
                entity_id,
                name: name.to_string(),
                parent_wallet_id: None,
                created_at: now,
            };
            Ok::<_, CanopyError>(Repository::create(txn, record)?)
        })?;
        tracing::info!(wallet = %wallet.id, entity = %entity_id, name = %wallet.name, "wallet created");
        Ok(wallet)
    }

    /// Create a sub-wallet under `parent_wallet_id`.
    ///
    /// The sub-wallet is owned by a new managed entity named after it, so
    /// authority over it flows from the parent through the forest rather
    /// than through shared ownership. Fails `Conflict` if the name is taken
    /// and `InvalidArgument` if it is blank.
    pub fn add_managed_wallet(
        &self,
        parent_wallet_id: WalletId,
        name: &str,
    ) -> Result<WalletRecord, CanopyError> {
        let name = validate_name(name, "wallet name")?;
        let now = self.clock.now();
        let wallet = self
            .store
            .write(|txn| insert_managed_wallet(txn, parent_wallet_id, name, now))?;
        tracing::info!(
            wallet = %wallet.id,
            parent = %parent_wallet_id,
            entity = %wallet.entity_id,
            name = %wallet.name,
            "managed wallet created"
        );
        Ok(wallet)
    }

    pub fn get_wallet(&self, id: WalletId) -> Result<WalletRecord, CanopyError> {
        self.store.read(|txn| wallet_by_id(txn, id))
    }

    pub fn get_wallet_by_name(&self, name: &str) -> Result<WalletRecord, CanopyError> {
        let name = validate_name(name, "wallet name")?;
        self.store.read(|txn| wallet_by_name(txn, name))
    }

    /// Direct children of `wallet_id`, ascending by id.
    pub fn get_sub_wallets(&self, wallet_id: WalletId) -> Result<Vec<WalletRecord>, CanopyError> {
        self.store.read(|txn| {
            wallet_by_id(txn, wallet_id)?;
            Ok(Repository::<WalletRecord>::find(txn, |w| {
                w.parent_wallet_id == Some(wallet_id)
            })?)
        })
    }

    pub fn wallets_of(&self, entity_id: EntityId) -> Result<Vec<WalletRecord>, CanopyError> {
        self.store.read(|txn| {
            entity_by_id(txn, entity_id)?;
            wallets_of_entity(txn, entity_id)
        })
    }

    /// Parent chain of `wallet_id`, nearest first.
    pub fn ancestors(&self, wallet_id: WalletId) -> Result<Vec<WalletId>, CanopyError> {
        self.store.read(|txn| ancestor_chain(txn, wallet_id))
    }
}

/// Insert a managed entity and its wallet under `parent_wallet_id`.
///
/// `name` must already be validated. Runs inside the caller's write so a
/// gated caller can check its authority over the parent first.
pub fn insert_managed_wallet(
    txn: &mut dyn StoreTxn,
    parent_wallet_id: WalletId,
    name: &str,
    now: Timestamp,
) -> Result<WalletRecord, CanopyError> {
    let parent = wallet_by_id(txn, parent_wallet_id)?;
    let managed = Repository::create(
        txn,
        EntityRecord {
            id: EntityId::new(0),
            name: name.to_string(),
            created_at: now,
        },
    )?;
    let record = WalletRecord {
        id: WalletId::new(0),
        entity_id: managed.id,
        name: name.to_string(),
        parent_wallet_id: Some(parent.id),
        created_at: now,
    };
    Ok(Repository::create(txn, record)?)
}
