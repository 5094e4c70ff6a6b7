//! Hashing primitives shared by the fingerprinters.
//!
//! Three widths are exposed: the fast non-cryptographic 64/128-bit xxh3
//! hashes and SHA-256 for the 256-bit width. All are deterministic across
//! runs and platforms, which is what makes fingerprints reproducible.

mod minhash;

pub use minhash::MinHasher;

use sha2::{Digest, Sha256};
use xxhash_rust::xxh3::{xxh3_128, xxh3_64};

/// 64-bit content hash.
#[must_use]
pub fn hash64(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// 128-bit content hash, big-endian bytes (byte 0 is the most significant,
/// so byte-wise lexicographic order equals numeric order).
#[must_use]
pub fn hash128(data: &[u8]) -> [u8; 16] {
    xxh3_128(data).to_be_bytes()
}

/// 256-bit content hash (SHA-256).
#[must_use]
pub fn hash256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}
