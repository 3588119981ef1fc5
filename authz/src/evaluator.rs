use std::sync::Arc;

use canopy_directory::{ancestor_chain, entity_by_id, wallet_by_id, wallets_of_entity};
use canopy_store::{Store, StoreTxn};
use canopy_trust::trusted_edge;
use canopy_types::{CanopyError, Capability, EntityId, TrustId, WalletId};

/// Why control was granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlGround {
    /// The actor is the target wallet.
    SameWallet,
    /// The acting entity owns the target wallet.
    Owner,
    /// The actor is an ancestor of the target in the wallet forest.
    Ancestor(WalletId),
    /// A trusted relationship grants the capability.
    Delegated(TrustId),
}

/// Wallet-to-wallet control inside an open transaction.
pub fn wallet_controls_in(
    txn: &dyn StoreTxn,
    acting: WalletId,
    target: WalletId,
    capability: Capability,
) -> Result<Option<ControlGround>, CanopyError> {
    let acting_wallet = wallet_by_id(txn, acting)?;
    let target_wallet = wallet_by_id(txn, target)?;

    if acting == target {
        return Ok(Some(ControlGround::SameWallet));
    }
    if ancestor_chain(txn, target)?.contains(&acting) {
        return Ok(Some(ControlGround::Ancestor(acting)));
    }
    let edge = trusted_edge(txn, target_wallet.entity_id, acting_wallet.entity_id, capability)?;
    Ok(edge.map(|e| ControlGround::Delegated(e.id)))
}

/// Entity-to-wallet control inside an open transaction: the entity owns the
/// target, or one of its wallets controls it.
pub fn entity_controls_in(
    txn: &dyn StoreTxn,
    acting: EntityId,
    target: WalletId,
    capability: Capability,
) -> Result<Option<ControlGround>, CanopyError> {
    entity_by_id(txn, acting)?;
    let target_wallet = wallet_by_id(txn, target)?;

    if target_wallet.entity_id == acting {
        return Ok(Some(ControlGround::Owner));
    }
    let chain = ancestor_chain(txn, target)?;
    if let Some(ancestor) = wallets_of_entity(txn, acting)?
        .into_iter()
        .map(|w| w.id)
        .find(|id| chain.contains(id))
    {
        return Ok(Some(ControlGround::Ancestor(ancestor)));
    }
    let edge = trusted_edge(txn, target_wallet.entity_id, acting, capability)?;
    Ok(edge.map(|e| ControlGround::Delegated(e.id)))
}

/// Read-only front door to the evaluator.
pub struct Authorizer<S> {
    store: Arc<S>,
}

impl<S> Clone for Authorizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> Authorizer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn has_control_over(
        &self,
        acting: WalletId,
        target: WalletId,
        capability: Capability,
    ) -> Result<bool, CanopyError> {
        let ground = self
            .store
            .read(|txn| wallet_controls_in(txn, acting, target, capability))?;
        tracing::debug!(%acting, %target, %capability, ?ground, "evaluated wallet control");
        Ok(ground.is_some())
    }

    pub fn entity_has_control_over(
        &self,
        acting: EntityId,
        target: WalletId,
        capability: Capability,
    ) -> Result<bool, CanopyError> {
        let ground = self
            .store
            .read(|txn| entity_controls_in(txn, acting, target, capability))?;
        tracing::debug!(%acting, %target, %capability, ?ground, "evaluated entity control");
        Ok(ground.is_some())
    }

    /// Like [`entity_has_control_over`](Self::entity_has_control_over), but a
    /// refusal is a `Forbidden` error.
    pub fn require_entity_control(
        &self,
        acting: EntityId,
        target: WalletId,
        capability: Capability,
    ) -> Result<ControlGround, CanopyError> {
        self.store
            .read(|txn| entity_controls_in(txn, acting, target, capability))?
            .ok_or_else(|| {
                CanopyError::Forbidden(format!(
                    "entity {acting} has no {capability} authority over wallet {target}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_directory::Directory;
    use canopy_nullables::{NullClock, NullStore};
    use canopy_trust::TrustGraph;
    use canopy_types::{ErrorKind, TrustType};

    struct Fixture {
        dir: Directory<NullStore>,
        graph: TrustGraph<NullStore>,
        authz: Authorizer<NullStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(NullStore::new());
        let clock: Arc<dyn canopy_types::Clock> = Arc::new(NullClock::default());
        Fixture {
            dir: Directory::new(Arc::clone(&store), Arc::clone(&clock)),
            graph: TrustGraph::new(Arc::clone(&store), clock),
            authz: Authorizer::new(store),
        }
    }

    #[test]
    fn ancestors_control_descendants_for_every_capability() {
        let f = fixture();
        let org = f.dir.create_entity("org").unwrap();
        let root = f.dir.create_wallet(org.id, "root").unwrap();
        let child = f.dir.add_managed_wallet(root.id, "child").unwrap();
        let grandchild = f.dir.add_managed_wallet(child.id, "grandchild").unwrap();

        for cap in TrustType::ALL {
            assert!(f.authz.has_control_over(root.id, grandchild.id, *cap).unwrap());
            assert!(f.authz.has_control_over(child.id, grandchild.id, *cap).unwrap());
            assert!(!f.authz.has_control_over(grandchild.id, root.id, *cap).unwrap());
        }
    }

    #[test]
    fn siblings_do_not_control_each_other() {
        let f = fixture();
        let org = f.dir.create_entity("org").unwrap();
        let root = f.dir.create_wallet(org.id, "root").unwrap();
        let a = f.dir.add_managed_wallet(root.id, "a").unwrap();
        let b = f.dir.add_managed_wallet(root.id, "b").unwrap();
        assert!(!f.authz.has_control_over(a.id, b.id, TrustType::Manage).unwrap());
    }

    #[test]
    fn delegated_trust_grants_only_its_own_capability() {
        let f = fixture();
        let alice = f.dir.create_entity("alice").unwrap();
        let bob = f.dir.create_entity("bob").unwrap();
        let wa = f.dir.create_wallet(alice.id, "walletA").unwrap();
        let wb = f.dir.create_wallet(bob.id, "walletB").unwrap();

        // alice originates a send edge towards bob; bob accepts.
        let edge = f.graph.request("send", "walletB", alice.id).unwrap();
        assert!(!f.authz.has_control_over(wb.id, wa.id, TrustType::Send).unwrap());
        f.graph.accept(edge.id, bob.id).unwrap();

        assert!(f.authz.has_control_over(wb.id, wa.id, TrustType::Send).unwrap());
        assert!(!f.authz.has_control_over(wb.id, wa.id, TrustType::Deduct).unwrap());
        // Trust is directed.
        assert!(!f.authz.has_control_over(wa.id, wb.id, TrustType::Send).unwrap());

        f.graph.cancel(edge.id, alice.id).unwrap();
        assert!(!f.authz.has_control_over(wb.id, wa.id, TrustType::Send).unwrap());
    }

    #[test]
    fn entity_control_covers_ownership_hierarchy_and_trust() {
        let f = fixture();
        let org = f.dir.create_entity("org").unwrap();
        let other = f.dir.create_entity("other").unwrap();
        let root = f.dir.create_wallet(org.id, "root").unwrap();
        let sub = f.dir.add_managed_wallet(root.id, "sub").unwrap();
        let theirs = f.dir.create_wallet(other.id, "theirs").unwrap();

        assert!(f.authz.entity_has_control_over(org.id, root.id, TrustType::Send).unwrap());
        assert!(f.authz.entity_has_control_over(org.id, sub.id, TrustType::Deduct).unwrap());
        assert!(!f.authz.entity_has_control_over(org.id, theirs.id, TrustType::Send).unwrap());

        let err = f
            .authz
            .require_entity_control(org.id, theirs.id, TrustType::Manage)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let edge = f.graph.request("manage", "root", other.id).unwrap();
        f.graph.accept(edge.id, org.id).unwrap();
        // `other` originated the edge, so org may manage other's wallets.
        assert_eq!(
            f.authz.require_entity_control(org.id, theirs.id, TrustType::Manage).unwrap(),
            ControlGround::Delegated(edge.id)
        );
    }

    #[test]
    fn unknown_wallets_are_not_found_rather_than_false() {
        let f = fixture();
        let org = f.dir.create_entity("org").unwrap();
        let root = f.dir.create_wallet(org.id, "root").unwrap();
        let err = f
            .authz
            .has_control_over(root.id, WalletId::new(77), TrustType::Send)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn evaluation_has_no_side_effects() {
        let f = fixture();
        let org = f.dir.create_entity("org").unwrap();
        let root = f.dir.create_wallet(org.id, "root").unwrap();
        let sub = f.dir.add_managed_wallet(root.id, "sub").unwrap();
        for _ in 0..3 {
            assert!(f.authz.has_control_over(root.id, sub.id, TrustType::Send).unwrap());
        }
        assert_eq!(f.dir.get_sub_wallets(root.id).unwrap().len(), 1);
    }
}
