use std::sync::Arc;

use canopy_directory::{entity_by_id, wallet_by_id, wallets_of_entity};
use canopy_store::schema::TOKEN_UUID_INDEX;
use canopy_store::{Repository, Store, StoreTxn, TokenRecord, TransferRecord, UniqueKey};
use canopy_types::{CanopyError, Clock, EntityId, TokenId, TreeId, WalletId};
use uuid::Uuid;

use crate::lookup::{token_by_id, tokens_in_wallet};

/// Read access to tokens, plus recording of newly issued ones.
pub struct TokenLedger<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for TokenLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: Store> TokenLedger<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record a token issued into `owner_wallet`.
    ///
    /// Without a parent the token roots a new lineage tree whose id is the
    /// token's own id. With a parent it joins the parent's tree.
    pub fn mint(
        &self,
        owner_wallet: WalletId,
        parent: Option<TokenId>,
    ) -> Result<TokenRecord, CanopyError> {
        let now = self.clock.now();
        let token = self.store.write(|txn| {
            wallet_by_id(txn, owner_wallet)?;
            let parent_tree = match parent {
                Some(p) => Some(token_by_id(txn, p)?.tree_id),
                None => None,
            };
            let mut token = Repository::create(
                txn,
                TokenRecord {
                    id: TokenId::new(0),
                    uuid: Uuid::new_v4(),
                    owner_wallet_id: owner_wallet,
                    tree_id: parent_tree.unwrap_or(TreeId::new(0)),
                    parent_id: parent,
                    created_at: now,
                },
            )?;
            if parent_tree.is_none() {
                token.tree_id = TreeId::new(token.id.get());
                Repository::update(txn, &token)?;
            }
            Ok::<_, CanopyError>(token)
        })?;
        tracing::info!(
            token = %token.id,
            uuid = %token.uuid,
            wallet = %owner_wallet,
            tree = %token.tree_id,
            "token minted"
        );
        Ok(token)
    }

    pub fn get_by_id(&self, id: TokenId) -> Result<TokenRecord, CanopyError> {
        self.store.read(|txn| token_by_id(txn, id))
    }

    /// Look a token up by its external identifier. A malformed UUID is
    /// `InvalidArgument`, an unknown one `NotFound`.
    pub fn get_by_uuid(&self, uuid: &str) -> Result<TokenRecord, CanopyError> {
        let parsed = Uuid::parse_str(uuid.trim())
            .map_err(|e| CanopyError::InvalidArgument(format!("token uuid `{uuid}`: {e}")))?;
        let key = UniqueKey::new(TOKEN_UUID_INDEX, parsed.as_bytes().to_vec());
        self.store.read(|txn| {
            Repository::<TokenRecord>::get_by_unique(txn, &key)?
                .ok_or_else(|| CanopyError::NotFound(format!("no token with uuid {parsed}")))
        })
    }

    /// Tokens held in any wallet owned by `entity_id`, ascending by id.
    pub fn list_by_owner(&self, entity_id: EntityId) -> Result<Vec<TokenRecord>, CanopyError> {
        self.store.read(|txn| {
            entity_by_id(txn, entity_id)?;
            let wallets: Vec<WalletId> = wallets_of_entity(txn, entity_id)?
                .into_iter()
                .map(|w| w.id)
                .collect();
            Ok(Repository::<TokenRecord>::find(txn, |t| {
                wallets.contains(&t.owner_wallet_id)
            })?)
        })
    }

    pub fn list_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<TokenRecord>, CanopyError> {
        self.store.read(|txn| tokens_in_wallet(txn, wallet_id))
    }

    /// Every token in a lineage tree, ascending by id. An unknown tree is
    /// simply empty.
    pub fn get_tree(&self, tree_id: TreeId) -> Result<Vec<TokenRecord>, CanopyError> {
        tracing::debug!(tree = %tree_id, "reading token tree");
        self.store.read(|txn| {
            Ok(Repository::<TokenRecord>::find(txn, |t| t.tree_id == tree_id)?)
        })
    }

    /// Every transfer ever opened for `token_id`, oldest first.
    pub fn history(&self, token_id: TokenId) -> Result<Vec<TransferRecord>, CanopyError> {
        self.store.read(|txn| {
            token_by_id(txn, token_id)?;
            Ok(Repository::<TransferRecord>::find(txn, |t| t.token_id == token_id)?)
        })
    }
}

/// Move `token_id` into `destination`. Only the claim path calls this.
pub(crate) fn reassign(
    txn: &mut dyn StoreTxn,
    token_id: TokenId,
    destination: WalletId,
) -> Result<TokenRecord, CanopyError> {
    let mut token = token_by_id(txn, token_id)?;
    token.owner_wallet_id = destination;
    Repository::update(txn, &token)?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_directory::Directory;
    use canopy_nullables::{NullClock, NullStore};
    use canopy_types::ErrorKind;

    fn setup() -> (Directory<NullStore>, TokenLedger<NullStore>) {
        let store = Arc::new(NullStore::new());
        let clock: Arc<dyn Clock> = Arc::new(NullClock::default());
        (
            Directory::new(Arc::clone(&store), Arc::clone(&clock)),
            TokenLedger::new(store, clock),
        )
    }

    #[test]
    fn root_tokens_start_their_own_tree() {
        let (dir, tokens) = setup();
        let owner = dir.create_entity("grower").unwrap();
        let wallet = dir.create_wallet(owner.id, "grower_main").unwrap();

        let first = tokens.mint(wallet.id, None).unwrap();
        let second = tokens.mint(wallet.id, None).unwrap();
        assert_eq!(first.tree_id, TreeId::new(first.id.get()));
        assert_ne!(first.tree_id, second.tree_id);
        assert_eq!(tokens.get_by_id(first.id).unwrap(), first);
    }

    #[test]
    fn derived_tokens_join_the_parent_tree() {
        let (dir, tokens) = setup();
        let owner = dir.create_entity("grower").unwrap();
        let wallet = dir.create_wallet(owner.id, "grower_main").unwrap();

        let root = tokens.mint(wallet.id, None).unwrap();
        let child = tokens.mint(wallet.id, Some(root.id)).unwrap();
        let grandchild = tokens.mint(wallet.id, Some(child.id)).unwrap();
        tokens.mint(wallet.id, None).unwrap();

        assert_eq!(grandchild.parent_id, Some(child.id));
        assert_eq!(
            tokens.get_tree(root.tree_id).unwrap(),
            vec![root, child, grandchild]
        );
        assert!(tokens.get_tree(TreeId::new(999)).unwrap().is_empty());
    }

    #[test]
    fn mint_into_missing_wallet_or_from_missing_parent_is_not_found() {
        let (dir, tokens) = setup();
        let owner = dir.create_entity("grower").unwrap();
        let wallet = dir.create_wallet(owner.id, "grower_main").unwrap();

        assert_eq!(
            tokens.mint(WalletId::new(9), None).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            tokens.mint(wallet.id, Some(TokenId::new(9))).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn lookup_by_uuid() {
        let (dir, tokens) = setup();
        let owner = dir.create_entity("grower").unwrap();
        let wallet = dir.create_wallet(owner.id, "grower_main").unwrap();
        let token = tokens.mint(wallet.id, None).unwrap();

        assert_eq!(tokens.get_by_uuid(&token.uuid.to_string()).unwrap(), token);
        assert_eq!(
            tokens.get_by_uuid("not-a-uuid").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            tokens.get_by_uuid(&Uuid::new_v4().to_string()).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn list_by_owner_spans_all_owned_wallets() {
        let (dir, tokens) = setup();
        let owner = dir.create_entity("grower").unwrap();
        let other = dir.create_entity("buyer").unwrap();
        let a = dir.create_wallet(owner.id, "a").unwrap();
        let b = dir.create_wallet(owner.id, "b").unwrap();
        let c = dir.create_wallet(other.id, "c").unwrap();

        let ta = tokens.mint(a.id, None).unwrap();
        let tb = tokens.mint(b.id, None).unwrap();
        tokens.mint(c.id, None).unwrap();

        assert_eq!(tokens.list_by_owner(owner.id).unwrap(), vec![ta.clone(), tb]);
        assert_eq!(tokens.list_by_wallet(a.id).unwrap(), vec![ta]);
        assert_eq!(
            tokens.list_by_owner(EntityId::new(50)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
