//! Active prover set for a filter.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::keys::PublicKey;

/// The authoritative set of public keys permitted to produce frames for a
/// filter. Stored alongside each accepted frame so verifiers can replay
/// membership checks at any height.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverTrie {
    keys: BTreeSet<PublicKey>,
}

impl ProverTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: impl IntoIterator<Item = PublicKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, key: PublicKey) {
        self.keys.insert(key);
    }

    pub fn remove(&mut self, key: &PublicKey) {
        self.keys.remove(key);
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

