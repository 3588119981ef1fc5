//! Property tests: in any wallet forest, control by hierarchy is exactly the
//! ancestor relation (plus self), independent of capability.

use std::sync::Arc;

use canopy_authz::Authorizer;
use canopy_directory::Directory;
use canopy_nullables::{NullClock, NullStore};
use canopy_types::{TrustType, WalletId};
use proptest::prelude::*;

/// A forest as a parent table: `parents[i]` is `None` for a root, otherwise
/// an index strictly below `i`.
fn forest() -> impl Strategy<Value = Vec<Option<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    prop_oneof![Just(None), (0..i).prop_map(Some)].boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

fn is_ancestor(parents: &[Option<usize>], ancestor: usize, mut node: usize) -> bool {
    while let Some(p) = parents[node] {
        if p == ancestor {
            return true;
        }
        node = p;
    }
    false
}

fn build(parents: &[Option<usize>]) -> (Authorizer<NullStore>, Vec<WalletId>) {
    let store = Arc::new(NullStore::new());
    let dir = Directory::new(Arc::clone(&store), Arc::new(NullClock::default()));
    let owner = dir.create_entity("owner").unwrap();
    let mut ids = Vec::with_capacity(parents.len());
    for (i, parent) in parents.iter().enumerate() {
        let name = format!("w{i}");
        let wallet = match parent {
            None => dir.create_wallet(owner.id, &name).unwrap(),
            Some(p) => dir.add_managed_wallet(ids[*p], &name).unwrap(),
        };
        ids.push(wallet.id);
    }
    (Authorizer::new(store), ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn hierarchy_control_matches_ancestry(parents in forest()) {
        let (authz, ids) = build(&parents);
        for a in 0..ids.len() {
            for b in 0..ids.len() {
                let expected = a == b || is_ancestor(&parents, a, b);
                for cap in TrustType::ALL {
                    let got = authz.has_control_over(ids[a], ids[b], *cap).unwrap();
                    prop_assert_eq!(got, expected, "w{} over w{} for {}", a, b, cap);
                }
            }
        }
    }
}
