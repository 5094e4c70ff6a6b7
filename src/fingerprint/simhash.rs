//! SimHash fingerprints.
//!
//! For a token multiset and bit width `f`: every token hash contributes `+1`
//! to accumulator `b` when bit `b` of the hash is set and `-1` otherwise;
//! the fingerprint sets bit `b` iff the accumulator ended positive. Similar
//! token multisets therefore land on nearby integers.

use crate::hashing::{hash128, hash256};

/// Supported fingerprint widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimHashWidth {
    F128,
    F256,
}

impl SimHashWidth {
    /// Width in bits.
    #[must_use]
    pub fn bits(self) -> usize {
        match self {
            Self::F128 => 128,
            Self::F256 => 256,
        }
    }

    fn token_hash(self, token: &[u8]) -> Vec<u8> {
        match self {
            Self::F128 => hash128(token).to_vec(),
            Self::F256 => hash256(token).to_vec(),
        }
    }
}

/// Compute the packed SimHash of a token stream at the given width.
///
/// The result is big-endian (byte 0 holds the most significant bits), so
/// byte-wise lexicographic comparison equals numeric comparison and splitting
/// it into equal chunks yields the LSH bands. An empty stream leaves every
/// accumulator at zero and packs to the all-zero value, the same key the
/// size-gated sentinel uses.
pub fn simhash<I, T>(tokens: I, width: SimHashWidth) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let f = width.bits();
    let mut sums = vec![0i64; f];
    for token in tokens {
        let h = width.token_hash(token.as_ref());
        for (b, sum) in sums.iter_mut().enumerate() {
            let bit = (h[b / 8] >> (7 - (b % 8))) & 1;
            *sum += if bit == 1 { 1 } else { -1 };
        }
    }
    let mut packed = vec![0u8; f / 8];
    for (b, &sum) in sums.iter().enumerate() {
        if sum > 0 {
            packed[b / 8] |= 1 << (7 - (b % 8));
        }
    }
    packed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hamming(a: &[u8], b: &[u8]) -> u32 {
        a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
    }

    #[test]
    fn widths_pack_to_expected_sizes() {
        let tokens = ["some reasonably long token"];
        assert_eq!(simhash(tokens, SimHashWidth::F128).len(), 16);
        assert_eq!(simhash(tokens, SimHashWidth::F256).len(), 32);
    }

    #[test]
    fn deterministic() {
        let tokens = ["alpha token", "beta token", "gamma token"];
        assert_eq!(
            simhash(tokens, SimHashWidth::F128),
            simhash(tokens, SimHashWidth::F128)
        );
    }

    #[test]
    fn empty_stream_packs_to_zero() {
        let packed = simhash(std::iter::empty::<&[u8]>(), SimHashWidth::F128);
        assert!(packed.iter().all(|&b| b == 0));
    }

    #[test]
    fn single_token_packs_its_positive_bits() {
        // With one token the accumulators are exactly the hash's ±1 bits,
        // so the packed value must equal the token hash.
        let packed = simhash(["only token here"], SimHashWidth::F128);
        assert_eq!(packed, hash128(b"only token here").to_vec());
    }

    #[test]
    fn similar_multisets_land_close() {
        let base: Vec<String> = (0..100).map(|i| format!("line number {i}")).collect();
        let mut edited = base.clone();
        edited[42] = "line number changed".to_string();
        let distant: Vec<String> = (0..100).map(|i| format!("other text {i}")).collect();

        let h_base = simhash(&base, SimHashWidth::F128);
        let h_edit = simhash(&edited, SimHashWidth::F128);
        let h_far = simhash(&distant, SimHashWidth::F128);

        let near = hamming(&h_base, &h_edit);
        let far = hamming(&h_base, &h_far);
        assert!(
            near < far,
            "one-line edit ({near} bits) should be closer than a rewrite ({far} bits)"
        );
    }
}
