//! MinHash sketches over token streams.
//!
//! Coordinate `k` of a sketch is the minimum over all tokens of
//! `h_k(hash64(token))`, where `h_k(x) = (a_k·x + b_k) mod p` with `p` a
//! Mersenne prime. The coefficients are derived from the coordinate index
//! with seeded xxh3 rather than a per-process random state: two runs (or two
//! machines) must produce identical sketches for the band collisions to be
//! reproducible.

use xxhash_rust::xxh3::xxh3_64_with_seed;

const MERSENNE_PRIME: u64 = (1 << 61) - 1;
const COEFF_SEED_A: u64 = 0x9e37_79b9_7f4a_7c15;
const COEFF_SEED_B: u64 = 0xc2b2_ae3d_27d4_eb4f;

/// Precomputed permutation family for sketches of a fixed width `f`.
#[derive(Debug, Clone)]
pub struct MinHasher {
    coeffs: Vec<(u64, u64)>,
}

impl MinHasher {
    /// Build a hasher producing sketches of `f` coordinates.
    #[must_use]
    pub fn new(f: usize) -> Self {
        let coeffs = (0..f as u64)
            .map(|k| {
                // Odd multiplier, so the map is a bijection on u64
                let a = xxh3_64_with_seed(&k.to_le_bytes(), COEFF_SEED_A) | 1;
                let b = xxh3_64_with_seed(&k.to_le_bytes(), COEFF_SEED_B);
                (a, b)
            })
            .collect();
        Self { coeffs }
    }

    /// Number of coordinates per sketch.
    #[must_use]
    pub fn width(&self) -> usize {
        self.coeffs.len()
    }

    /// Sketch a token multiset. An empty token stream yields the all-max
    /// sketch, so empty inputs collide only with other empty inputs.
    pub fn sketch<I, T>(&self, tokens: I) -> Vec<u32>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut mins = vec![u32::MAX; self.coeffs.len()];
        for token in tokens {
            let x = crate::hashing::hash64(token.as_ref());
            for (slot, &(a, b)) in mins.iter_mut().zip(self.coeffs.iter()) {
                let h = (a.wrapping_mul(x).wrapping_add(b) % MERSENNE_PRIME) as u32;
                if h < *slot {
                    *slot = h;
                }
            }
        }
        mins
    }
}
