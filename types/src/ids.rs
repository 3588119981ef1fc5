//! Row identifiers.
//!
//! Every table is keyed by a `u64` assigned by the store. The newtypes keep a
//! wallet id from being passed where an entity id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// A principal (person or organisation).
    EntityId
);
row_id!(
    /// A named custody container.
    WalletId
);
row_id!(
    /// A trust relationship row.
    TrustId
);
row_id!(
    /// A token row (the internal id, not the external UUID).
    TokenId
);
row_id!(
    /// A transfer row.
    TransferId
);
row_id!(
    /// A lineage group. Equal to the id of the token that rooted the tree.
    TreeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_as_raw_number() {
        assert_eq!(WalletId::new(42).to_string(), "42");
        assert_eq!(u64::from(EntityId::from(7)), 7);
    }
}
