//! Coin storage for the token intrinsic.

use std::collections::BTreeMap;
use std::sync::RwLock;

use pulse_types::{Coin, CoinId, PublicKey};

use crate::StoreError;

/// Trait for persisting the coin set managed by the token intrinsic.
pub trait CoinStore: Send + Sync {
    fn put_coin(&self, coin: &Coin) -> Result<(), StoreError>;

    fn delete_coin(&self, coin_id: &CoinId) -> Result<(), StoreError>;

    fn get_coin(&self, coin_id: &CoinId) -> Result<Coin, StoreError>;

    /// All coins, ordered by coin id (deterministic iteration for state
    /// root computation).
    fn iter_coins(&self) -> Result<Vec<Coin>, StoreError>;

    /// Coins owned by `owner`, ordered by coin id.
    fn coins_for_owner(&self, owner: &PublicKey) -> Result<Vec<Coin>, StoreError>;
}

/// In-memory coin store.
pub struct MemoryCoinStore {
    coins: RwLock<BTreeMap<CoinId, Coin>>,
}

impl MemoryCoinStore {
    pub fn new() -> Self {
        Self {
            coins: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryCoinStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinStore for MemoryCoinStore {
    fn put_coin(&self, coin: &Coin) -> Result<(), StoreError> {
        let mut coins = self
            .coins
            .write()
            .map_err(|_| StoreError::Backend("coin map lock poisoned".into()))?;
        coins.insert(coin.coin_id, coin.clone());
        Ok(())
    }

    fn delete_coin(&self, coin_id: &CoinId) -> Result<(), StoreError> {
        let mut coins = self
            .coins
            .write()
            .map_err(|_| StoreError::Backend("coin map lock poisoned".into()))?;
        coins.remove(coin_id);
        Ok(())
    }

    fn get_coin(&self, coin_id: &CoinId) -> Result<Coin, StoreError> {
        let coins = self
            .coins
            .read()
            .map_err(|_| StoreError::Backend("coin map lock poisoned".into()))?;
        coins
            .get(coin_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{:?}", coin_id)))
    }

    fn iter_coins(&self) -> Result<Vec<Coin>, StoreError> {
        let coins = self
            .coins
            .read()
            .map_err(|_| StoreError::Backend("coin map lock poisoned".into()))?;
        Ok(coins.values().cloned().collect())
    }

    fn coins_for_owner(&self, owner: &PublicKey) -> Result<Vec<Coin>, StoreError> {
        let coins = self
            .coins
            .read()
            .map_err(|_| StoreError::Backend("coin map lock poisoned".into()))?;
        Ok(coins
            .values()
            .filter(|c| &c.owner == owner)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(id: u8, owner: u8, amount: u64) -> Coin {
        Coin {
            coin_id: CoinId([id; 32]),
            owner: PublicKey([owner; 32]),
            amount,
        }
    }

    #[test]
    fn put_get_delete() {
        let store = MemoryCoinStore::new();
        let c = coin(1, 9, 100);
        store.put_coin(&c).unwrap();
        assert_eq!(store.get_coin(&c.coin_id).unwrap(), c);

        store.delete_coin(&c.coin_id).unwrap();
        assert!(matches!(
            store.get_coin(&c.coin_id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn iter_is_ordered_by_id() {
        let store = MemoryCoinStore::new();
        store.put_coin(&coin(3, 1, 10)).unwrap();
        store.put_coin(&coin(1, 1, 20)).unwrap();
        store.put_coin(&coin(2, 2, 30)).unwrap();
        let ids: Vec<u8> = store
            .iter_coins()
            .unwrap()
            .iter()
            .map(|c| c.coin_id.0[0])
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn coins_for_owner_filters() {
        let store = MemoryCoinStore::new();
        store.put_coin(&coin(1, 1, 10)).unwrap();
        store.put_coin(&coin(2, 2, 20)).unwrap();
        store.put_coin(&coin(3, 1, 30)).unwrap();
        let owned = store.coins_for_owner(&PublicKey([1u8; 32])).unwrap();
        assert_eq!(owned.len(), 2);
    }
}
