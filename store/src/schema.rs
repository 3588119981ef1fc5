//! Row shapes of the custody core.
//!
//! ```text
//! entity(id, name)
//! wallet(id, entity_id, name UNIQUE, parent_wallet_id NULLABLE)
//! entity_trust(id, originating_entity_id, target_entity_id, trust_type, state, request_type, created_at)
//! token(id, uuid UNIQUE, owner_wallet_id, tree_id)
//! transfer(id, token_id, source_entity_id, destination_entity_id, type, state, active, claim)
//! ```

use canopy_types::{
    EntityId, Timestamp, TokenId, TransferId, TransferState, TransferType, TreeId, TrustId,
    TrustRequestType, TrustState, TrustType, WalletId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{Record, Table, UniqueKey};

/// Index name for `wallet.name`.
pub const WALLET_NAME_INDEX: &str = "wallet.name";
/// Index name for `token.uuid`.
pub const TOKEN_UUID_INDEX: &str = "token.uuid";

/// A principal owning one or more wallets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: String,
    pub created_at: Timestamp,
}

impl Record for EntityRecord {
    const TABLE: Table = Table::Entity;
    type Id = EntityId;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// A named custody container. Top-level wallets have no parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: WalletId,
    pub entity_id: EntityId,
    pub name: String,
    pub parent_wallet_id: Option<WalletId>,
    pub created_at: Timestamp,
}

impl Record for WalletRecord {
    const TABLE: Table = Table::Wallet;
    type Id = WalletId;

    fn id(&self) -> WalletId {
        self.id
    }

    fn set_id(&mut self, id: WalletId) {
        self.id = id;
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(WALLET_NAME_INDEX, self.name.as_bytes())]
    }
}

/// A directed, typed trust edge from `originating_entity_id` to
/// `target_entity_id`. Rows are never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRecord {
    pub id: TrustId,
    pub originating_entity_id: EntityId,
    pub target_entity_id: EntityId,
    pub trust_type: TrustType,
    pub state: TrustState,
    pub request_type: TrustRequestType,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record for TrustRecord {
    const TABLE: Table = Table::EntityTrust;
    type Id = TrustId;

    fn id(&self) -> TrustId {
        self.id
    }

    fn set_id(&mut self, id: TrustId) {
        self.id = id;
    }
}

/// A unit of custody.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: TokenId,
    pub uuid: Uuid,
    pub owner_wallet_id: WalletId,
    pub tree_id: TreeId,
    /// The token this one was derived from, if any.
    pub parent_id: Option<TokenId>,
    pub created_at: Timestamp,
}

impl Record for TokenRecord {
    const TABLE: Table = Table::Token;
    type Id = TokenId;

    fn id(&self) -> TokenId {
        self.id
    }

    fn set_id(&mut self, id: TokenId) {
        self.id = id;
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(TOKEN_UUID_INDEX, self.uuid.as_bytes().to_vec())]
    }
}

/// A pending or finished movement of one token between wallets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub token_id: TokenId,
    pub source_entity_id: EntityId,
    pub destination_entity_id: EntityId,
    pub source_wallet_id: WalletId,
    pub destination_wallet_id: WalletId,
    pub transfer_type: TransferType,
    pub state: TransferState,
    pub active: bool,
    pub claim: bool,
    pub created_at: Timestamp,
    pub closed_at: Option<Timestamp>,
}

impl TransferRecord {
    /// Pending and active: the one state that blocks another transfer of the token.
    pub fn is_open(&self) -> bool {
        self.state == TransferState::Pending && self.active
    }
}

impl Record for TransferRecord {
    const TABLE: Table = Table::Transfer;
    type Id = TransferId;

    fn id(&self) -> TransferId {
        self.id
    }

    fn set_id(&mut self, id: TransferId) {
        self.id = id;
    }
}
