//! The trust graph state machine.

use std::sync::Arc;

use canopy_directory::{entity_by_id, validate_name, wallet_by_id, wallet_by_name};
use canopy_store::{CasOutcome, Repository, Store, StoreTxn, TrustRecord};
use canopy_types::{
    CanopyError, Clock, EntityId, TrustId, TrustRequestType, TrustState, WalletId,
};

use crate::filter::TrustFilter;
use crate::lookup::{relationships_of, trust_by_id, trusted_edge};

/// Requests, accepts, cancels and lists trust relationships.
pub struct TrustGraph<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for TrustGraph<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: Store> TrustGraph<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Request trust from the entity owning `target_wallet_name`.
    ///
    /// `request_type` is the raw value received from the caller and must be
    /// one of the six request types.
    pub fn request(
        &self,
        request_type: &str,
        target_wallet_name: &str,
        acting: EntityId,
    ) -> Result<TrustRecord, CanopyError> {
        let request_type: TrustRequestType = request_type.parse()?;
        self.request_typed(request_type, target_wallet_name, acting)
    }

    pub fn request_typed(
        &self,
        request_type: TrustRequestType,
        target_wallet_name: &str,
        acting: EntityId,
    ) -> Result<TrustRecord, CanopyError> {
        let wallet_name = validate_name(target_wallet_name, "wallet name")?;
        let now = self.clock.now();

        let row = self.store.write(|txn| {
            entity_by_id(txn, acting)?;
            let wallet = wallet_by_name(txn, wallet_name)?;
            if wallet.entity_id == acting {
                return Err(CanopyError::InvalidArgument(format!(
                    "wallet `{wallet_name}` belongs to the requesting entity"
                )));
            }
            let record = TrustRecord {
                id: TrustId::new(0),
                originating_entity_id: acting,
                target_entity_id: wallet.entity_id,
                trust_type: request_type.trust_type(),
                state: TrustState::Requested,
                request_type,
                created_at: now,
                updated_at: now,
            };
            Ok(Repository::create(txn, record)?)
        })?;

        tracing::info!(
            trust = %row.id,
            originator = %row.originating_entity_id,
            target = %row.target_entity_id,
            trust_type = %row.trust_type,
            request_type = %row.request_type,
            "trust requested"
        );
        Ok(row)
    }

    /// Accept a pending request. Only the target may accept, and only once.
    ///
    /// The transition is one compare-and-set on `(id, requested)` inside a
    /// serialized write, so of two concurrent accepts exactly one succeeds and
    /// the other observes `trusted` and fails `Conflict`.
    pub fn accept(&self, id: TrustId, acting: EntityId) -> Result<TrustRecord, CanopyError> {
        let now = self.clock.now();
        let result = self.store.write(|txn| {
            let row = trust_by_id(txn, id)?;
            if row.target_entity_id != acting {
                return Err(CanopyError::Forbidden(format!(
                    "entity {acting} is not the target of trust relationship {id}"
                )));
            }
            if row.state != TrustState::Requested {
                return Err(already(&row));
            }
            if let Some(existing) = trusted_edge(
                txn,
                row.originating_entity_id,
                row.target_entity_id,
                row.trust_type,
            )? {
                return Err(CanopyError::Conflict(format!(
                    "trust relationship {} already grants {} from entity {} to entity {}",
                    existing.id, row.trust_type, row.originating_entity_id, row.target_entity_id
                )));
            }
            transition(txn, id, TrustState::Requested, TrustState::Trusted, now)
        });

        match &result {
            Ok(row) => tracing::info!(trust = %id, entity = %acting, trust_type = %row.trust_type, "trust accepted"),
            Err(e) => tracing::warn!(trust = %id, entity = %acting, error = %e, "trust accept refused"),
        }
        result
    }

    /// Cancel a requested or trusted relationship. Either party may cancel;
    /// the resulting state records which one did.
    pub fn cancel(&self, id: TrustId, acting: EntityId) -> Result<TrustRecord, CanopyError> {
        let now = self.clock.now();
        let result = self.store.write(|txn| {
            let row = trust_by_id(txn, id)?;
            let cancelled = if acting == row.originating_entity_id {
                TrustState::CancelledByOriginator
            } else if acting == row.target_entity_id {
                TrustState::CancelledByActor
            } else {
                return Err(CanopyError::Forbidden(format!(
                    "entity {acting} is not a party to trust relationship {id}"
                )));
            };
            if !row.state.is_cancellable() {
                return Err(already(&row));
            }
            transition(txn, id, row.state, cancelled, now)
        });

        match &result {
            Ok(row) => tracing::info!(trust = %id, entity = %acting, state = %row.state, "trust cancelled"),
            Err(e) => tracing::warn!(trust = %id, entity = %acting, error = %e, "trust cancel refused"),
        }
        result
    }

    pub fn get(&self, id: TrustId) -> Result<TrustRecord, CanopyError> {
        self.store.read(|txn| trust_by_id(txn, id))
    }

    /// Every relationship `entity_id` takes part in, as originator or target,
    /// that matches `filter`. Ascending by id.
    pub fn list_by_entity(
        &self,
        entity_id: EntityId,
        filter: &TrustFilter,
    ) -> Result<Vec<TrustRecord>, CanopyError> {
        self.store.read(|txn| {
            entity_by_id(txn, entity_id)?;
            relationships_of(txn, entity_id, filter)
        })
    }

    /// Relationships of the entity owning `wallet_id`.
    pub fn list_by_wallet(
        &self,
        wallet_id: WalletId,
        filter: &TrustFilter,
    ) -> Result<Vec<TrustRecord>, CanopyError> {
        self.store.read(|txn| {
            let wallet = wallet_by_id(txn, wallet_id)?;
            relationships_of(txn, wallet.entity_id, filter)
        })
    }
}

fn already(row: &TrustRecord) -> CanopyError {
    CanopyError::Conflict(format!(
        "trust relationship {} is already {}",
        row.id, row.state
    ))
}

fn transition(
    txn: &mut dyn StoreTxn,
    id: TrustId,
    from: TrustState,
    to: TrustState,
    now: canopy_types::Timestamp,
) -> Result<TrustRecord, CanopyError> {
    let outcome = Repository::<TrustRecord>::compare_and_set(
        txn,
        id,
        |r| r.state == from,
        |r| {
            r.state = to;
            r.updated_at = now;
        },
    )?;
    match outcome {
        CasOutcome::Applied(row) => Ok(row),
        CasOutcome::Missing => Err(CanopyError::NotFound(format!(
            "the trust relationship id:{id} does not exist"
        ))),
        CasOutcome::Mismatch(row) => Err(already(&row)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_directory::Directory;
    use canopy_nullables::{NullClock, NullStore};
    use canopy_types::{ErrorKind, TrustType};

    struct Fixture {
        graph: TrustGraph<NullStore>,
        clock: Arc<NullClock>,
        entity1: EntityId,
        entity2: EntityId,
        entity3: EntityId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(1_000));
        let dir = Directory::new(Arc::clone(&store), clock.clone());
        let e1 = dir.create_entity("entity1").unwrap();
        let e2 = dir.create_entity("entity2").unwrap();
        let e3 = dir.create_entity("entity3").unwrap();
        dir.create_wallet(e1.id, "walletA").unwrap();
        dir.create_wallet(e2.id, "walletB").unwrap();
        dir.create_wallet(e3.id, "walletC").unwrap();
        Fixture {
            graph: TrustGraph::new(store, clock.clone()),
            clock,
            entity1: e1.id,
            entity2: e2.id,
            entity3: e3.id,
        }
    }

    #[test]
    fn request_creates_requested_row() {
        let f = fixture();
        let row = f.graph.request("send", "walletB", f.entity1).unwrap();
        assert_eq!(row.trust_type, TrustType::Send);
        assert_eq!(row.state, TrustState::Requested);
        assert_eq!(row.request_type, TrustRequestType::Send);
        assert_eq!(row.originating_entity_id, f.entity1);
        assert_eq!(row.target_entity_id, f.entity2);
    }

    #[test]
    fn request_with_a_wrong_type_is_invalid_argument() {
        let f = fixture();
        let err = f.graph.request("invalidType", "walletB", f.entity1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn request_with_a_blank_wallet_name_is_invalid_argument() {
        let f = fixture();
        let err = f.graph.request("send", " \t", f.entity1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn request_for_unknown_wallet_is_not_found() {
        let f = fixture();
        let err = f.graph.request("manage", "nowhere", f.entity1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn request_to_own_wallet_is_invalid_argument() {
        let f = fixture();
        let err = f.graph.request("deduct", "walletA", f.entity1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn inverse_request_types_map_onto_their_capability() {
        let f = fixture();
        let row = f.graph.request("release", "walletB", f.entity1).unwrap();
        assert_eq!(row.trust_type, TrustType::Deduct);
        assert_eq!(row.request_type, TrustRequestType::Release);
    }

    #[test]
    fn accept_then_accept_again_is_conflict() {
        let f = fixture();
        let row = f.graph.request("send", "walletB", f.entity1).unwrap();
        f.clock.advance(60);
        let accepted = f.graph.accept(row.id, f.entity2).unwrap();
        assert_eq!(accepted.state, TrustState::Trusted);
        assert_eq!(accepted.updated_at.elapsed_since(f.clock.now()), 0);
        assert_eq!(accepted.created_at, row.created_at);

        let again = f.graph.accept(row.id, f.entity2).unwrap_err();
        assert_eq!(again.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn accept_of_a_nonexistent_id_is_not_found() {
        let f = fixture();
        let err = f.graph.accept(TrustId::new(999), f.entity2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn only_the_target_may_accept() {
        let f = fixture();
        let row = f.graph.request("send", "walletB", f.entity1).unwrap();
        assert_eq!(f.graph.accept(row.id, f.entity1).unwrap_err().kind(), ErrorKind::Forbidden);
        assert_eq!(f.graph.accept(row.id, f.entity3).unwrap_err().kind(), ErrorKind::Forbidden);
        assert_eq!(f.graph.get(row.id).unwrap().state, TrustState::Requested);
    }

    #[test]
    fn second_trusted_edge_of_the_same_kind_is_refused() {
        let f = fixture();
        let first = f.graph.request("send", "walletB", f.entity1).unwrap();
        let second = f.graph.request("received", "walletB", f.entity1).unwrap();
        f.graph.accept(first.id, f.entity2).unwrap();

        let err = f.graph.accept(second.id, f.entity2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(f.graph.get(second.id).unwrap().state, TrustState::Requested);

        // Once the first edge is cancelled the second may take its place.
        f.graph.cancel(first.id, f.entity1).unwrap();
        assert_eq!(f.graph.accept(second.id, f.entity2).unwrap().state, TrustState::Trusted);
    }

    #[test]
    fn cancel_records_which_party_cancelled() {
        let f = fixture();
        let a = f.graph.request("manage", "walletB", f.entity1).unwrap();
        let b = f.graph.request("deduct", "walletB", f.entity1).unwrap();
        f.graph.accept(b.id, f.entity2).unwrap();

        let by_originator = f.graph.cancel(a.id, f.entity1).unwrap();
        assert_eq!(by_originator.state, TrustState::CancelledByOriginator);
        let by_target = f.graph.cancel(b.id, f.entity2).unwrap();
        assert_eq!(by_target.state, TrustState::CancelledByActor);
    }

    #[test]
    fn cancelled_relationships_are_terminal() {
        let f = fixture();
        let row = f.graph.request("send", "walletB", f.entity1).unwrap();
        f.graph.cancel(row.id, f.entity2).unwrap();

        assert_eq!(f.graph.cancel(row.id, f.entity1).unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(f.graph.accept(row.id, f.entity2).unwrap_err().kind(), ErrorKind::Conflict);

        // Re-establishing trust takes a fresh row.
        let fresh = f.graph.request("send", "walletB", f.entity1).unwrap();
        assert_ne!(fresh.id, row.id);
        assert_eq!(fresh.state, TrustState::Requested);
    }

    #[test]
    fn outsiders_cannot_cancel() {
        let f = fixture();
        let row = f.graph.request("send", "walletB", f.entity1).unwrap();
        assert_eq!(f.graph.cancel(row.id, f.entity3).unwrap_err().kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn list_by_entity_applies_every_filter() {
        let f = fixture();
        let send = f.graph.request("send", "walletB", f.entity1).unwrap();
        let manage = f.graph.request("manage", "walletC", f.entity1).unwrap();
        let inbound = f.graph.request("yield", "walletA", f.entity3).unwrap();
        f.graph.accept(send.id, f.entity2).unwrap();

        let all = f.graph.list_by_entity(f.entity1, &TrustFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![send.id, manage.id, inbound.id]);

        let trusted = f
            .graph
            .list_by_entity(f.entity1, &TrustFilter::default().with_state(TrustState::Trusted))
            .unwrap();
        assert_eq!(trusted.len(), 1);
        assert_eq!(trusted[0].id, send.id);

        let manage_only = f
            .graph
            .list_by_entity(f.entity1, &TrustFilter::parse(None, Some("manage"), None).unwrap())
            .unwrap();
        let ids: Vec<_> = manage_only.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![manage.id, inbound.id]);

        let yields = f
            .graph
            .list_by_entity(f.entity1, &TrustFilter::parse(None, None, Some("yield")).unwrap())
            .unwrap();
        assert_eq!(yields.len(), 1);

        let none_for_2 = f
            .graph
            .list_by_entity(f.entity2, &TrustFilter::default().with_trust_type(TrustType::Deduct))
            .unwrap();
        assert!(none_for_2.is_empty());
    }

    #[test]
    fn list_by_wallet_resolves_the_owner() {
        let f = fixture();
        f.graph.request("send", "walletB", f.entity1).unwrap();
        let rows = f
            .graph
            .list_by_wallet(WalletId::new(2), &TrustFilter::default())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target_entity_id, f.entity2);
    }
}
