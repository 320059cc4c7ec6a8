//! Chunked inclusion commitments with positional openings.
//!
//! The committed byte vector is sliced into fixed-size chunks, each chunk is
//! hashed into a leaf, and the leaves form a Merkle tree. The commitment is
//! the root; an opening proof is the sibling path for the chunk at the
//! requested position. Odd nodes are paired with themselves.

use pulse_crypto::{blake2b_256, blake2b_256_multi};

use crate::ProverError;

/// Commits to byte vectors and opens them at a position.
pub trait InclusionProver: Send + Sync {
    /// Commit to `data` sliced into `chunk_size`-byte chunks. Deterministic.
    fn commit_raw(&self, data: &[u8], chunk_size: usize) -> Result<Vec<u8>, ProverError>;

    /// Produce an opening proof for the chunk at `position`. Deterministic.
    fn prove_raw(
        &self,
        data: &[u8],
        position: usize,
        chunk_size: usize,
    ) -> Result<Vec<u8>, ProverError>;

    /// Check that `chunk` is the `position`-th chunk of the vector behind
    /// `commitment`.
    fn verify_raw(
        &self,
        commitment: &[u8],
        position: usize,
        chunk: &[u8],
        proof: &[u8],
    ) -> Result<(), ProverError>;
}

/// Merkle-tree inclusion prover.
pub struct MerkleInclusionProver;

impl MerkleInclusionProver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MerkleInclusionProver {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash `data` into chunk leaves. The final chunk is zero-padded to the
/// chunk size so the leaf set is a pure function of (data, chunk_size).
fn chunk_leaves(data: &[u8], chunk_size: usize) -> Result<Vec<[u8; 32]>, ProverError> {
    if chunk_size == 0 {
        return Err(ProverError::InvalidInput("chunk size must be nonzero".into()));
    }
    if data.is_empty() {
        return Err(ProverError::InvalidInput("cannot commit to empty data".into()));
    }
    Ok(data
        .chunks(chunk_size)
        .map(|chunk| {
            if chunk.len() == chunk_size {
                blake2b_256(chunk)
            } else {
                let mut padded = vec![0u8; chunk_size];
                padded[..chunk.len()].copy_from_slice(chunk);
                blake2b_256(&padded)
            }
        })
        .collect())
}

fn parent(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    blake2b_256_multi(&[left, right])
}

/// Reduce a level to its parent level, pairing a trailing odd node with
/// itself.
fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => parent(left, right),
            [lone] => parent(lone, lone),
            _ => unreachable!(),
        })
        .collect()
}

impl InclusionProver for MerkleInclusionProver {
    fn commit_raw(&self, data: &[u8], chunk_size: usize) -> Result<Vec<u8>, ProverError> {
        let mut level = chunk_leaves(data, chunk_size)?;
        while level.len() > 1 {
            level = next_level(&level);
        }
        Ok(level[0].to_vec())
    }

    fn prove_raw(
        &self,
        data: &[u8],
        position: usize,
        chunk_size: usize,
    ) -> Result<Vec<u8>, ProverError> {
        let mut level = chunk_leaves(data, chunk_size)?;
        if position >= level.len() {
            return Err(ProverError::InvalidInput(format!(
                "position {position} out of range for {} chunks",
                level.len()
            )));
        }

        let mut proof = Vec::new();
        let mut index = position;
        while level.len() > 1 {
            let sibling = if index % 2 == 0 {
                // Right sibling, or the node itself when it sits alone at
                // the end of an odd level.
                *level.get(index + 1).unwrap_or(&level[index])
            } else {
                level[index - 1]
            };
            proof.extend_from_slice(&sibling);
            index /= 2;
            level = next_level(&level);
        }
        Ok(proof)
    }

    fn verify_raw(
        &self,
        commitment: &[u8],
        position: usize,
        chunk: &[u8],
        proof: &[u8],
    ) -> Result<(), ProverError> {
        if proof.len() % 32 != 0 {
            return Err(ProverError::InclusionRejected(
                "proof is not a whole number of sibling hashes".into(),
            ));
        }
        let mut node = blake2b_256(chunk);
        let mut index = position;
        for sibling_bytes in proof.chunks(32) {
            let mut sibling = [0u8; 32];
            sibling.copy_from_slice(sibling_bytes);
            node = if index % 2 == 0 {
                parent(&node, &sibling)
            } else {
                parent(&sibling, &node)
            };
            index /= 2;
        }
        if node.as_slice() != commitment {
            return Err(ProverError::InclusionRejected("root mismatch".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_crypto::shake256_expand;
    use pulse_types::{EXPANSION_BYTES, INCLUSION_CHUNK_BYTES};

    #[test]
    fn commit_is_deterministic() {
        let prover = MerkleInclusionProver::new();
        let data = shake256_expand(b"commit", EXPANSION_BYTES);
        let a = prover.commit_raw(&data, INCLUSION_CHUNK_BYTES).unwrap();
        let b = prover.commit_raw(&data, INCLUSION_CHUNK_BYTES).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn every_position_opens() {
        let prover = MerkleInclusionProver::new();
        let data = shake256_expand(b"open", EXPANSION_BYTES);
        let commitment = prover.commit_raw(&data, INCLUSION_CHUNK_BYTES).unwrap();

        for position in 0..EXPANSION_BYTES / INCLUSION_CHUNK_BYTES {
            let proof = prover
                .prove_raw(&data, position, INCLUSION_CHUNK_BYTES)
                .unwrap();
            let chunk =
                &data[position * INCLUSION_CHUNK_BYTES..(position + 1) * INCLUSION_CHUNK_BYTES];
            prover
                .verify_raw(&commitment, position, chunk, &proof)
                .unwrap();
        }
    }

    #[test]
    fn opening_position_from_first_expand_byte() {
        // The engine derives the opening position as expand[0] % 16 so a
        // verifier can replay the choice.
        let prover = MerkleInclusionProver::new();
        let expand = shake256_expand(b"derived position", EXPANSION_BYTES);
        let position = (expand[0] % 16) as usize;

        let commitment = prover.commit_raw(&expand, INCLUSION_CHUNK_BYTES).unwrap();
        let proof = prover
            .prove_raw(&expand, position, INCLUSION_CHUNK_BYTES)
            .unwrap();
        let chunk =
            &expand[position * INCLUSION_CHUNK_BYTES..(position + 1) * INCLUSION_CHUNK_BYTES];
        prover
            .verify_raw(&commitment, position, chunk, &proof)
            .unwrap();
    }

    #[test]
    fn wrong_chunk_rejected() {
        let prover = MerkleInclusionProver::new();
        let data = shake256_expand(b"wrong chunk", EXPANSION_BYTES);
        let commitment = prover.commit_raw(&data, INCLUSION_CHUNK_BYTES).unwrap();
        let proof = prover.prove_raw(&data, 3, INCLUSION_CHUNK_BYTES).unwrap();

        let forged = [0xFFu8; INCLUSION_CHUNK_BYTES];
        assert!(prover.verify_raw(&commitment, 3, &forged, &proof).is_err());
    }

    #[test]
    fn wrong_position_rejected() {
        let prover = MerkleInclusionProver::new();
        let data = shake256_expand(b"wrong position", EXPANSION_BYTES);
        let commitment = prover.commit_raw(&data, INCLUSION_CHUNK_BYTES).unwrap();
        let proof = prover.prove_raw(&data, 3, INCLUSION_CHUNK_BYTES).unwrap();
        let chunk = &data[3 * INCLUSION_CHUNK_BYTES..4 * INCLUSION_CHUNK_BYTES];

        assert!(prover.verify_raw(&commitment, 4, chunk, &proof).is_err());
    }

    #[test]
    fn odd_chunk_counts_commit_and_open() {
        let prover = MerkleInclusionProver::new();
        // 5 chunks of 16 bytes (last one short, zero-padded).
        let data = shake256_expand(b"odd", 70);
        let commitment = prover.commit_raw(&data, 16).unwrap();

        for position in 0..5 {
            let proof = prover.prove_raw(&data, position, 16).unwrap();
            let start = position * 16;
            let end = (start + 16).min(data.len());
            let mut chunk = vec![0u8; 16];
            chunk[..end - start].copy_from_slice(&data[start..end]);
            prover
                .verify_raw(&commitment, position, &chunk, &proof)
                .unwrap();
        }
    }

    #[test]
    fn empty_data_rejected() {
        let prover = MerkleInclusionProver::new();
        assert!(prover.commit_raw(&[], 16).is_err());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let prover = MerkleInclusionProver::new();
        assert!(prover.commit_raw(b"data", 0).is_err());
    }

    #[test]
    fn out_of_range_position_rejected() {
        let prover = MerkleInclusionProver::new();
        let data = shake256_expand(b"range", EXPANSION_BYTES);
        assert!(prover
            .prove_raw(&data, EXPANSION_BYTES / INCLUSION_CHUNK_BYTES, INCLUSION_CHUNK_BYTES)
            .is_err());
    }
}
