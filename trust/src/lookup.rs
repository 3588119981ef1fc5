//! Transaction-scoped trust queries.

use canopy_store::{Repository, StoreTxn, TrustRecord};
use canopy_types::{CanopyError, EntityId, TrustId, TrustState, TrustType};

use crate::TrustFilter;

/// Fetch a relationship, failing loudly when the id does not exist.
pub fn trust_by_id(txn: &dyn StoreTxn, id: TrustId) -> Result<TrustRecord, CanopyError> {
    Repository::<TrustRecord>::get(txn, id)?.ok_or_else(|| {
        CanopyError::NotFound(format!("the trust relationship id:{id} does not exist"))
    })
}

/// The `trusted` edge granting `trust_type` from `originator` to `target`, if any.
pub fn trusted_edge(
    txn: &dyn StoreTxn,
    originator: EntityId,
    target: EntityId,
    trust_type: TrustType,
) -> Result<Option<TrustRecord>, CanopyError> {
    Ok(Repository::<TrustRecord>::find_first(txn, |r| {
        r.originating_entity_id == originator
            && r.target_entity_id == target
            && r.trust_type == trust_type
            && r.state == TrustState::Trusted
    })?)
}

/// Every relationship `entity_id` takes part in, as originator or target,
/// that matches `filter`. Ascending by id.
pub fn relationships_of(
    txn: &dyn StoreTxn,
    entity_id: EntityId,
    filter: &TrustFilter,
) -> Result<Vec<TrustRecord>, CanopyError> {
    tracing::debug!(entity = %entity_id, ?filter, "listing trust relationships");
    Ok(Repository::<TrustRecord>::find(txn, |r| {
        (r.originating_entity_id == entity_id || r.target_entity_id == entity_id)
            && filter.matches(r)
    })?)
}
