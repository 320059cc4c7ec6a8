//! Token application state machine.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use pulse_crypto::{blake2b_256, blake2b_256_multi, verify_signature};
use pulse_store::CoinStore;
use pulse_types::{Coin, CoinId, Frame, FrameFilter, ProverTrie, PublicKey, Signature};

use crate::ExecutionError;

/// Address of the token intrinsic inside execution outputs.
pub const TOKEN_ADDRESS: [u8; 32] = [
    0x01, 0x6b, 0x3a, 0x90, 0xc4, 0x2e, 0x5f, 0x18, 0x77, 0x0d, 0xae, 0x21, 0x58, 0xf3, 0x4c,
    0x09, 0x92, 0x6e, 0x1a, 0x85, 0x3b, 0xd7, 0x60, 0x4f, 0xc8, 0x13, 0xe5, 0x2a, 0x7d, 0xb1,
    0x36, 0x99,
];

/// Owners holding more than this many coins after a minting round get their
/// coins merged when auto-merge is enabled.
pub const DEFAULT_AUTO_MERGE_THRESHOLD: usize = 16;

/// A staged transaction request, drained at each proving round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenRequest {
    /// Create a new coin for `owner`.
    Mint { owner: PublicKey, amount: u64 },
    /// Move a coin to `to`; signed by the current owner over the coin id
    /// and recipient.
    Transfer {
        coin_id: CoinId,
        to: PublicKey,
        signature: Signature,
    },
    /// Collapse several coins of one owner into a single coin.
    Merge {
        owner: PublicKey,
        coin_ids: Vec<CoinId>,
    },
    /// Split a coin into several; signed by the owner over the coin id and
    /// amounts.
    Split {
        coin_id: CoinId,
        amounts: Vec<u64>,
        signature: Signature,
    },
}

/// Bytes a transfer's owner signs.
pub fn transfer_payload(coin_id: &CoinId, to: &PublicKey) -> [u8; 32] {
    blake2b_256_multi(&[coin_id.as_bytes(), to.as_bytes()])
}

/// Bytes a split's owner signs.
pub fn split_payload(coin_id: &CoinId, amounts: &[u64]) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(32 + amounts.len() * 8);
    encoded.extend_from_slice(coin_id.as_bytes());
    for amount in amounts {
        encoded.extend_from_slice(&amount.to_be_bytes());
    }
    blake2b_256(&encoded)
}

/// Deterministic state summary produced after a round's transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputState {
    pub frame_number: u64,
    pub total_supply: u128,
    pub coin_count: u64,
    pub state_root: [u8; 32],
}

enum StoreOp {
    Put(Coin),
    Delete(CoinId),
}

/// The token application materialized for one proving round.
///
/// Holds a working copy of the coin set; mutations touch the copy and are
/// written through to the coin store only when a round commits.
pub struct TokenApplication {
    filter: FrameFilter,
    frame_number: u64,
    coins: BTreeMap<CoinId, Coin>,
    coin_store: Arc<dyn CoinStore>,
    auto_merge_threshold: Option<usize>,
    pending_ops: Vec<StoreOp>,
}

impl TokenApplication {
    /// Materialize the application state as of `previous`.
    ///
    /// Refuses a non-genesis frame whose producer is outside every active
    /// prover trie.
    pub fn materialize_from_frame(
        previous: &Frame,
        tries: &[ProverTrie],
        coin_store: Arc<dyn CoinStore>,
        auto_merge_threshold: Option<usize>,
    ) -> Result<Self, ExecutionError> {
        if previous.frame_number > 0
            && !tries
                .iter()
                .any(|t| t.contains(&previous.public_key_signature.public_key))
        {
            return Err(ExecutionError::UnknownProducer);
        }

        let coins = coin_store
            .iter_coins()?
            .into_iter()
            .map(|c| (c.coin_id, c))
            .collect();

        Ok(Self {
            filter: previous.filter,
            frame_number: previous.frame_number,
            coins,
            coin_store,
            auto_merge_threshold,
            pending_ops: Vec::new(),
        })
    }

    /// Apply the staged requests for `frame_number`, partitioning them into
    /// valid and invalid. When `commit` is set the surviving coin set is
    /// written through to the coin store.
    pub fn apply_transitions(
        mut self,
        frame_number: u64,
        staged: Vec<TokenRequest>,
        commit: bool,
    ) -> Result<(Self, Vec<TokenRequest>, Vec<TokenRequest>), ExecutionError> {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        let mut minted_owners: Vec<PublicKey> = Vec::new();

        for (index, request) in staged.into_iter().enumerate() {
            if self.apply_request(&request, frame_number, index as u64) {
                if let TokenRequest::Mint { owner, .. } = &request {
                    if !minted_owners.contains(owner) {
                        minted_owners.push(owner.clone());
                    }
                }
                valid.push(request);
            } else {
                invalid.push(request);
            }
        }

        if let Some(threshold) = self.auto_merge_threshold {
            for owner in minted_owners {
                self.auto_merge(&owner, threshold, frame_number);
            }
        }

        if commit {
            for op in self.pending_ops.drain(..) {
                match op {
                    StoreOp::Put(coin) => self.coin_store.put_coin(&coin)?,
                    StoreOp::Delete(coin_id) => self.coin_store.delete_coin(&coin_id)?,
                }
            }
        } else {
            self.pending_ops.clear();
        }

        self.frame_number = frame_number;
        Ok((self, valid, invalid))
    }

    /// Deterministic summary of the working coin set.
    pub fn materialize_state(&self) -> Result<OutputState, ExecutionError> {
        let mut total_supply: u128 = 0;
        let mut root_input = Vec::with_capacity(self.coins.len() * 72);
        for coin in self.coins.values() {
            total_supply += coin.amount as u128;
            root_input.extend_from_slice(coin.coin_id.as_bytes());
            root_input.extend_from_slice(coin.owner.as_bytes());
            root_input.extend_from_slice(&coin.amount.to_be_bytes());
        }
        Ok(OutputState {
            frame_number: self.frame_number,
            total_supply,
            coin_count: self.coins.len() as u64,
            state_root: blake2b_256(&root_input),
        })
    }

    /// Serialize an output state for digestion.
    pub fn serialize_state(state: &OutputState) -> Result<Vec<u8>, ExecutionError> {
        bincode::serialize(state).map_err(|e| ExecutionError::Serialization(e.to_string()))
    }

    /// Serialize the valid-request partition for the execution proof.
    pub fn serialize_requests(requests: &[TokenRequest]) -> Result<Vec<u8>, ExecutionError> {
        bincode::serialize(requests).map_err(|e| ExecutionError::Serialization(e.to_string()))
    }

    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    pub fn coins_for_owner(&self, owner: &PublicKey) -> Vec<Coin> {
        self.coins
            .values()
            .filter(|c| &c.owner == owner)
            .cloned()
            .collect()
    }

    /// Returns `true` and mutates the working set when the request is valid.
    fn apply_request(&mut self, request: &TokenRequest, frame_number: u64, index: u64) -> bool {
        match request {
            TokenRequest::Mint { owner, amount } => {
                if *amount == 0 || owner.is_zero() {
                    return false;
                }
                let coin = Coin {
                    coin_id: self.new_coin_id(frame_number, index, 0),
                    owner: owner.clone(),
                    amount: *amount,
                };
                self.insert_coin(coin);
                true
            }
            TokenRequest::Transfer {
                coin_id,
                to,
                signature,
            } => {
                let Some(coin) = self.coins.get(coin_id) else {
                    return false;
                };
                if to.is_zero()
                    || !verify_signature(&transfer_payload(coin_id, to), signature, &coin.owner)
                {
                    return false;
                }
                let moved = Coin {
                    coin_id: *coin_id,
                    owner: to.clone(),
                    amount: coin.amount,
                };
                self.insert_coin(moved);
                true
            }
            TokenRequest::Merge { owner, coin_ids } => {
                if coin_ids.len() < 2 {
                    return false;
                }
                let mut total: u64 = 0;
                for coin_id in coin_ids {
                    match self.coins.get(coin_id) {
                        Some(coin) if &coin.owner == owner => {
                            let Some(next) = total.checked_add(coin.amount) else {
                                return false;
                            };
                            total = next;
                        }
                        _ => return false,
                    }
                }
                for coin_id in coin_ids {
                    self.remove_coin(coin_id);
                }
                let merged = Coin {
                    coin_id: self.new_coin_id(frame_number, index, 0),
                    owner: owner.clone(),
                    amount: total,
                };
                self.insert_coin(merged);
                true
            }
            TokenRequest::Split {
                coin_id,
                amounts,
                signature,
            } => {
                let Some(coin) = self.coins.get(coin_id) else {
                    return false;
                };
                if amounts.len() < 2 || amounts.iter().any(|a| *a == 0) {
                    return false;
                }
                let mut sum: u64 = 0;
                for amount in amounts {
                    let Some(next) = sum.checked_add(*amount) else {
                        return false;
                    };
                    sum = next;
                }
                if sum != coin.amount
                    || !verify_signature(&split_payload(coin_id, amounts), signature, &coin.owner)
                {
                    return false;
                }
                let owner = coin.owner.clone();
                self.remove_coin(coin_id);
                for (part, amount) in amounts.iter().enumerate() {
                    let piece = Coin {
                        coin_id: self.new_coin_id(frame_number, index, part as u64),
                        owner: owner.clone(),
                        amount: *amount,
                    };
                    self.insert_coin(piece);
                }
                true
            }
        }
    }

    /// Collapse an owner's coins into one when they exceed the threshold.
    fn auto_merge(&mut self, owner: &PublicKey, threshold: usize, frame_number: u64) {
        let owned = self.coins_for_owner(owner);
        if owned.len() <= threshold {
            return;
        }
        let mut total: u64 = 0;
        for coin in &owned {
            match total.checked_add(coin.amount) {
                Some(next) => total = next,
                // Saturated balances stay split rather than lose value.
                None => return,
            }
        }
        tracing::debug!(
            coins = owned.len(),
            "auto-merging coins after minting round"
        );
        for coin in &owned {
            self.remove_coin(&coin.coin_id);
        }
        let merged = Coin {
            coin_id: self.new_coin_id(frame_number, u64::MAX, 0),
            owner: owner.clone(),
            amount: total,
        };
        self.insert_coin(merged);
    }

    fn insert_coin(&mut self, coin: Coin) {
        self.pending_ops.push(StoreOp::Put(coin.clone()));
        self.coins.insert(coin.coin_id, coin);
    }

    fn remove_coin(&mut self, coin_id: &CoinId) {
        self.pending_ops.push(StoreOp::Delete(*coin_id));
        self.coins.remove(coin_id);
    }

    fn new_coin_id(&self, frame_number: u64, index: u64, part: u64) -> CoinId {
        let mut input = Vec::with_capacity(32 + 24);
        input.extend_from_slice(self.filter.as_bytes());
        input.extend_from_slice(&frame_number.to_be_bytes());
        input.extend_from_slice(&index.to_be_bytes());
        input.extend_from_slice(&part.to_be_bytes());
        CoinId(blake2b_256(&input))
    }
}
