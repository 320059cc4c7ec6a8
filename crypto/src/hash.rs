//! Blake2b hashing and SHAKE-256 expansion.

use blake2::digest::consts::{U32, U64};
use blake2::{Blake2b, Digest};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

type Blake2b256 = Blake2b<U32>;
type Blake2b512 = Blake2b<U64>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    Digest::update(&mut hasher, data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        Digest::update(&mut hasher, part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute a 512-bit Blake2b hash of arbitrary data.
pub fn blake2b_512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    Digest::update(&mut hasher, data);
    let result = hasher.finalize();
    let mut output = [0u8; 64];
    output.copy_from_slice(&result);
    output
}

/// Expand `data` through the SHAKE-256 extendable-output function, reading
/// exactly `out_len` bytes.
pub fn shake256_expand(data: &[u8], out_len: usize) -> Vec<u8> {
    let mut digest = Shake256::default();
    digest.update(data);
    let mut reader = digest.finalize_xof();
    let mut out = vec![0u8; out_len];
    reader.read(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_deterministic() {
        let h1 = blake2b_256(b"hello pulse");
        let h2 = blake2b_256(b"hello pulse");
        assert_eq!(h1, h2);
    }

    #[test]
    fn blake2b_256_different_inputs() {
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn blake2b_512_width() {
        let h = blake2b_512(b"pulse");
        assert_ne!(h, [0u8; 64]);
    }

    #[test]
    fn shake_expand_length_and_determinism() {
        let a = shake256_expand(b"seed", 1024);
        let b = shake256_expand(b"seed", 1024);
        assert_eq!(a.len(), 1024);
        assert_eq!(a, b);
    }

    #[test]
    fn shake_expand_prefix_consistent() {
        // Reading fewer bytes yields a prefix of the longer read.
        let long = shake256_expand(b"seed", 1024);
        let short = shake256_expand(b"seed", 64);
        assert_eq!(&long[..64], &short[..]);
    }

    #[test]
    fn shake_expand_input_sensitivity() {
        assert_ne!(shake256_expand(b"seed-a", 64), shake256_expand(b"seed-b", 64));
    }
}
