//! The composition root handed to API collaborators.

use std::sync::Arc;

use canopy_authz::{entity_controls_in, Authorizer, ControlGround};
use canopy_directory::{insert_managed_wallet, validate_name, wallet_by_name, Directory};
use canopy_ledger::{tokens_in_wallet, TokenLedger, TransferWorkflow};
use canopy_store::{Repository, Store, StoreTxn, TokenRecord, TrustRecord, WalletRecord};
use canopy_store_lmdb::LmdbEnvironment;
use canopy_trust::{relationships_of, TrustFilter, TrustGraph};
use canopy_types::{CanopyError, Capability, Clock, EntityId, SystemClock, WalletId};
use serde::Serialize;

use crate::{ServiceConfig, ServiceError};

/// A sub-wallet as listed to whoever controls its parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    pub wallet: WalletRecord,
    pub tokens_in_wallet: usize,
    /// Relationships of the entity owning the wallet, in any state.
    pub trust_relationships: Vec<TrustRecord>,
}

/// One store handle plus every component built on it.
///
/// Cloning is cheap and shares the store.
pub struct Custody<S> {
    store: Arc<S>,
    directory: Directory<S>,
    trust: TrustGraph<S>,
    authz: Authorizer<S>,
    tokens: TokenLedger<S>,
    transfers: TransferWorkflow<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for Custody<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            directory: self.directory.clone(),
            trust: self.trust.clone(),
            authz: self.authz.clone(),
            tokens: self.tokens.clone(),
            transfers: self.transfers.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl Custody<LmdbEnvironment> {
    /// Open (or create) the LMDB environment named by `config` and run any
    /// pending schema migrations.
    pub fn open(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let env = LmdbEnvironment::open(&config.data_dir, config.map_size())?;
        Ok(Self::new(Arc::new(env), Arc::new(SystemClock)))
    }

    /// Flush the environment to disk and release this handle.
    pub fn shutdown(self) -> Result<(), ServiceError> {
        self.store.sync()?;
        tracing::info!(path = %self.store.path().display(), "custody store closed");
        Ok(())
    }
}

impl<S: Store> Custody<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory: Directory::new(Arc::clone(&store), Arc::clone(&clock)),
            trust: TrustGraph::new(Arc::clone(&store), Arc::clone(&clock)),
            authz: Authorizer::new(Arc::clone(&store)),
            tokens: TokenLedger::new(Arc::clone(&store), Arc::clone(&clock)),
            transfers: TransferWorkflow::new(Arc::clone(&store), Arc::clone(&clock)),
            store,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn directory(&self) -> &Directory<S> {
        &self.directory
    }

    pub fn trust(&self) -> &TrustGraph<S> {
        &self.trust
    }

    pub fn authz(&self) -> &Authorizer<S> {
        &self.authz
    }

    pub fn tokens(&self) -> &TokenLedger<S> {
        &self.tokens
    }

    pub fn transfers(&self) -> &TransferWorkflow<S> {
        &self.transfers
    }

    /// Create a managed sub-wallet under the wallet named `parent_name`.
    /// `actor` must hold `manage` control over the parent.
    pub fn add_managed_wallet_as(
        &self,
        actor: EntityId,
        parent_name: &str,
        name: &str,
    ) -> Result<WalletRecord, CanopyError> {
        let parent_name = validate_name(parent_name, "wallet name")?;
        let name = validate_name(name, "wallet name")?;
        let now = self.clock.now();
        let wallet = self.store.write(|txn| {
            let parent = wallet_by_name(txn, parent_name)?;
            require_control(txn, actor, parent.id, Capability::Manage)?;
            insert_managed_wallet(txn, parent.id, name, now)
        })?;
        tracing::info!(
            actor = %actor,
            wallet = %wallet.id,
            parent = parent_name,
            "managed wallet created on behalf of actor"
        );
        Ok(wallet)
    }

    /// Tokens held in the wallet named `wallet_name`, provided `actor`
    /// controls it.
    pub fn tokens_in_wallet_as(
        &self,
        actor: EntityId,
        wallet_name: &str,
    ) -> Result<Vec<TokenRecord>, CanopyError> {
        let wallet_name = validate_name(wallet_name, "wallet name")?;
        self.store.read(|txn| {
            let wallet = wallet_by_name(txn, wallet_name)?;
            require_control(txn, actor, wallet.id, Capability::Manage)?;
            tokens_in_wallet(txn, wallet.id)
        })
    }

    /// Direct sub-wallets of `wallet_id` with their token counts and trust
    /// relationships, provided `actor` controls it. All from one snapshot.
    pub fn sub_wallets_as(
        &self,
        actor: EntityId,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletSummary>, CanopyError> {
        self.store.read(|txn| {
            require_control(txn, actor, wallet_id, Capability::Manage)?;
            let subs = Repository::<WalletRecord>::find(txn, |w| {
                w.parent_wallet_id == Some(wallet_id)
            })?;
            subs.into_iter()
                .map(|wallet| {
                    Ok(WalletSummary {
                        tokens_in_wallet: tokens_in_wallet(txn, wallet.id)?.len(),
                        trust_relationships: relationships_of(
                            txn,
                            wallet.entity_id,
                            &TrustFilter::default(),
                        )?,
                        wallet,
                    })
                })
                .collect()
        })
    }
}

impl<S: Store + 'static> Custody<S> {
    /// Run a blocking core operation on tokio's blocking pool.
    ///
    /// Store transactions are synchronous; async callers go through here so
    /// a slow commit never stalls a runtime worker.
    pub async fn call<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&Custody<S>) -> Result<T, CanopyError> + Send + 'static,
        T: Send + 'static,
    {
        let custody = self.clone();
        let result = tokio::task::spawn_blocking(move || f(&custody))
            .await
            .map_err(|e| ServiceError::Join(e.to_string()))?;
        Ok(result?)
    }
}

fn require_control(
    txn: &dyn StoreTxn,
    actor: EntityId,
    wallet: WalletId,
    capability: Capability,
) -> Result<ControlGround, CanopyError> {
    entity_controls_in(txn, actor, wallet, capability)?.ok_or_else(|| {
        tracing::warn!(actor = %actor, wallet = %wallet, %capability, "control check refused");
        CanopyError::Forbidden(format!(
            "entity {actor} has no {capability} authority over wallet {wallet}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_nullables::{NullClock, NullStore};
    use canopy_types::ErrorKind;

    fn custody() -> Custody<NullStore> {
        Custody::new(Arc::new(NullStore::new()), Arc::new(NullClock::default()))
    }

    #[test]
    fn managed_wallets_need_manage_control_over_the_parent() {
        let c = custody();
        let org = c.directory().create_entity("org").unwrap();
        let outsider = c.directory().create_entity("outsider").unwrap();
        let top = c.directory().create_wallet(org.id, "org_main").unwrap();

        let sub = c.add_managed_wallet_as(org.id, "org_main", "truck").unwrap();
        assert_eq!(sub.parent_wallet_id, Some(top.id));

        let err = c.add_managed_wallet_as(outsider.id, "org_main", "van").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(c.directory().get_wallet_by_name("van").is_err());

        // Hierarchy reaches grandchildren.
        let leaf = c.add_managed_wallet_as(org.id, "truck", "truck_crate").unwrap();
        assert_eq!(c.directory().ancestors(leaf.id).unwrap(), vec![sub.id, top.id]);
    }

    #[test]
    fn tokens_in_wallet_are_visible_only_with_control() {
        let c = custody();
        let org = c.directory().create_entity("org").unwrap();
        let outsider = c.directory().create_entity("outsider").unwrap();
        let top = c.directory().create_wallet(org.id, "org_main").unwrap();
        let sub = c.directory().add_managed_wallet(top.id, "truck").unwrap();
        let token = c.tokens().mint(sub.id, None).unwrap();

        assert_eq!(c.tokens_in_wallet_as(org.id, "truck").unwrap(), vec![token]);
        assert_eq!(
            c.tokens_in_wallet_as(outsider.id, "truck").unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            c.tokens_in_wallet_as(org.id, "missing").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn sub_wallet_listing_carries_tokens_and_trust() {
        let c = custody();
        let org = c.directory().create_entity("org").unwrap();
        let partner = c.directory().create_entity("partner").unwrap();
        let top = c.directory().create_wallet(org.id, "org_main").unwrap();
        c.directory().create_wallet(partner.id, "partner_main").unwrap();
        let truck = c.directory().add_managed_wallet(top.id, "truck").unwrap();
        let van = c.directory().add_managed_wallet(top.id, "van").unwrap();
        c.tokens().mint(truck.id, None).unwrap();
        c.tokens().mint(truck.id, None).unwrap();
        let edge = c
            .trust()
            .request("send", "partner_main", truck.entity_id)
            .unwrap();

        let listed = c.sub_wallets_as(org.id, top.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].wallet.id, truck.id);
        assert_eq!(listed[0].tokens_in_wallet, 2);
        assert_eq!(listed[0].trust_relationships, vec![edge]);
        assert_eq!(listed[1].wallet.id, van.id);
        assert_eq!(listed[1].tokens_in_wallet, 0);
        assert!(listed[1].trust_relationships.is_empty());
    }

    #[test]
    fn sub_wallets_follow_the_same_gate() {
        let c = custody();
        let org = c.directory().create_entity("org").unwrap();
        let outsider = c.directory().create_entity("outsider").unwrap();
        let top = c.directory().create_wallet(org.id, "org_main").unwrap();
        let sub = c.directory().add_managed_wallet(top.id, "truck").unwrap();

        let listed = c.sub_wallets_as(org.id, top.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].wallet, sub);
        assert_eq!(listed[0].tokens_in_wallet, 0);
        assert!(listed[0].trust_relationships.is_empty());
        assert_eq!(
            c.sub_wallets_as(outsider.id, top.id).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
    }
}
