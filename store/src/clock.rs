//! Clock frame storage.

use std::collections::HashMap;
use std::sync::RwLock;

use pulse_types::{Frame, FrameFilter, ProverTrie};

use crate::StoreError;

/// Trait for persisting accepted data clock frames and the prover tries in
/// effect at each height.
///
/// Callers get read-only frame views; the time reel is the only write path.
pub trait ClockStore: Send + Sync {
    /// Persist a frame together with the prover tries in effect at its
    /// height. Overwrites any frame already stored at that height.
    fn put_data_clock_frame(
        &self,
        frame: &Frame,
        tries: &[ProverTrie],
    ) -> Result<(), StoreError>;

    /// Load the frame at `frame_number` for `filter` plus the prover tries
    /// in effect at that height.
    fn get_data_clock_frame(
        &self,
        filter: &FrameFilter,
        frame_number: u64,
    ) -> Result<(Frame, Vec<ProverTrie>), StoreError>;

    /// The highest accepted frame for `filter`.
    fn latest_data_clock_frame(&self, filter: &FrameFilter) -> Result<Frame, StoreError>;

    /// The prover tries currently in effect for `filter`.
    fn get_prover_tries(&self, filter: &FrameFilter) -> Result<Vec<ProverTrie>, StoreError>;

    /// Replace the prover tries for `filter`.
    fn put_prover_tries(
        &self,
        filter: &FrameFilter,
        tries: Vec<ProverTrie>,
    ) -> Result<(), StoreError>;
}

/// In-memory clock store.
pub struct MemoryClockStore {
    frames: RwLock<HashMap<(FrameFilter, u64), (Frame, Vec<ProverTrie>)>>,
    heads: RwLock<HashMap<FrameFilter, u64>>,
    tries: RwLock<HashMap<FrameFilter, Vec<ProverTrie>>>,
}

impl MemoryClockStore {
    pub fn new() -> Self {
        Self {
            frames: RwLock::new(HashMap::new()),
            heads: RwLock::new(HashMap::new()),
            tries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryClockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockStore for MemoryClockStore {
    fn put_data_clock_frame(
        &self,
        frame: &Frame,
        tries: &[ProverTrie],
    ) -> Result<(), StoreError> {
        let mut frames = self
            .frames
            .write()
            .map_err(|_| StoreError::Backend("frame map lock poisoned".into()))?;
        frames.insert(
            (frame.filter, frame.frame_number),
            (frame.clone(), tries.to_vec()),
        );
        let mut heads = self
            .heads
            .write()
            .map_err(|_| StoreError::Backend("head map lock poisoned".into()))?;
        let head = heads.entry(frame.filter).or_insert(frame.frame_number);
        if frame.frame_number > *head {
            *head = frame.frame_number;
        }
        Ok(())
    }

    fn get_data_clock_frame(
        &self,
        filter: &FrameFilter,
        frame_number: u64,
    ) -> Result<(Frame, Vec<ProverTrie>), StoreError> {
        let frames = self
            .frames
            .read()
            .map_err(|_| StoreError::Backend("frame map lock poisoned".into()))?;
        frames
            .get(&(*filter, frame_number))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("frame {frame_number}")))
    }

    fn latest_data_clock_frame(&self, filter: &FrameFilter) -> Result<Frame, StoreError> {
        let head = {
            let heads = self
                .heads
                .read()
                .map_err(|_| StoreError::Backend("head map lock poisoned".into()))?;
            *heads
                .get(filter)
                .ok_or_else(|| StoreError::NotFound("no frames for filter".into()))?
        };
        self.get_data_clock_frame(filter, head).map(|(f, _)| f)
    }

    fn get_prover_tries(&self, filter: &FrameFilter) -> Result<Vec<ProverTrie>, StoreError> {
        let tries = self
            .tries
            .read()
            .map_err(|_| StoreError::Backend("trie map lock poisoned".into()))?;
        Ok(tries.get(filter).cloned().unwrap_or_default())
    }

    fn put_prover_tries(
        &self,
        filter: &FrameFilter,
        new_tries: Vec<ProverTrie>,
    ) -> Result<(), StoreError> {
        let mut tries = self
            .tries
            .write()
            .map_err(|_| StoreError::Backend("trie map lock poisoned".into()))?;
        tries.insert(*filter, new_tries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_types::SignedProducer;

    fn frame(number: u64) -> Frame {
        Frame {
            frame_number: number,
            timestamp: number as i64 * 1000,
            filter: FrameFilter::ZERO,
            input: vec![0u8; 516],
            aggregate_proofs: vec![],
            public_key_signature: SignedProducer::genesis(),
        }
    }

    #[test]
    fn put_then_get_roundtrip() {
        let store = MemoryClockStore::new();
        let f = frame(3);
        store.put_data_clock_frame(&f, &[]).unwrap();
        let (got, tries) = store.get_data_clock_frame(&FrameFilter::ZERO, 3).unwrap();
        assert_eq!(got, f);
        assert!(tries.is_empty());
    }

    #[test]
    fn latest_tracks_highest() {
        let store = MemoryClockStore::new();
        store.put_data_clock_frame(&frame(1), &[]).unwrap();
        store.put_data_clock_frame(&frame(5), &[]).unwrap();
        store.put_data_clock_frame(&frame(3), &[]).unwrap();
        let latest = store.latest_data_clock_frame(&FrameFilter::ZERO).unwrap();
        assert_eq!(latest.frame_number, 5);
    }

    #[test]
    fn missing_frame_is_not_found() {
        let store = MemoryClockStore::new();
        let result = store.get_data_clock_frame(&FrameFilter::ZERO, 9);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn prover_tries_roundtrip() {
        let store = MemoryClockStore::new();
        let trie = ProverTrie::from_keys([pulse_types::PublicKey([1u8; 32])]);
        store
            .put_prover_tries(&FrameFilter::ZERO, vec![trie.clone()])
            .unwrap();
        let got = store.get_prover_tries(&FrameFilter::ZERO).unwrap();
        assert_eq!(got, vec![trie]);
    }
}
