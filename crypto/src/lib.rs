//! Cryptographic primitives for the pulse protocol: Blake2b hashing,
//! SHAKE-256 digest expansion, and Ed25519 producer signatures.

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi, blake2b_512, shake256_expand};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
