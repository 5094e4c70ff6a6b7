//! Blob fingerprints: content reading, size gating and parallel computation.
//!
//! Every blob index receives a fingerprint even when the content is skipped:
//! the sentinel stands in for "too large, too small or unreadable" so the
//! downstream sort still sees a key for every index. Sentinel blobs sort
//! together but are never treated as similar to each other.

mod simhash;
mod tlsh;
mod tokens;

pub use simhash::{simhash, SimHashWidth};
pub use tlsh::tlsh_body;
pub use tokens::{fixed_window_shingles, line_shingles, DEFAULT_LEN_LIMIT};

use crate::manifest::Dataset;
use crate::order::OrderParams;
use rayon::prelude::*;
use std::path::Path;

/// A compact, comparable representation of one blob's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    SimHash128([u8; 16]),
    SimHash256([u8; 32]),
    /// TLSH body (64 hex chars; empty when the content was too small or too
    /// uniform to hash)
    Tlsh(String),
    MinHash(Vec<u32>),
    /// Blob skipped: too large, too small or unreadable
    Sentinel,
}

impl Fingerprint {
    /// Sort key for the 128-bit SimHash ordering; the sentinel keys as zero,
    /// so skipped blobs group at the front in their original order.
    #[must_use]
    pub fn simhash128_key(&self) -> [u8; 16] {
        match self {
            Self::SimHash128(bytes) => *bytes,
            _ => [0u8; 16],
        }
    }

    /// Sort key for the TLSH ordering. Oversized and unreadable blobs key as
    /// `"0"`, hashed-but-degenerate content as the empty body.
    #[must_use]
    pub fn tlsh_key(&self) -> &str {
        match self {
            Self::Tlsh(body) => body,
            _ => "0",
        }
    }
}

/// Computes fingerprints for blobs of one dataset, in parallel on the
/// ambient rayon pool. Results come back indexed by row in input order, so
/// the pass is deterministic regardless of scheduling.
pub struct Fingerprinter<'a> {
    dataset: &'a Dataset,
    input_dir: &'a Path,
    params: &'a OrderParams,
}

impl<'a> Fingerprinter<'a> {
    #[must_use]
    pub fn new(dataset: &'a Dataset, input_dir: &'a Path, params: &'a OrderParams) -> Self {
        Self {
            dataset,
            input_dir,
            params,
        }
    }

    /// Read a blob as lossy UTF-8. `None` (plus a warning) on read failure.
    fn read_text(&self, row: u32) -> Option<String> {
        let path = self.dataset.blob_path(self.input_dir, row);
        match std::fs::read(&path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cannot read blob, using sentinel");
                None
            }
        }
    }

    fn read_bytes(&self, row: u32) -> Option<Vec<u8>> {
        let path = self.dataset.blob_path(self.input_dir, row);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cannot read blob, using sentinel");
                None
            }
        }
    }

    /// 128-bit SimHash over line shingles; blobs at or above the size gate
    /// get the sentinel.
    pub fn simhash128_all(&self, rows: &[u32]) -> Vec<(u32, Fingerprint)> {
        rows.par_iter()
            .map(|&row| {
                let length = self.dataset.record(row).length;
                if length >= self.params.simhash_max_bytes {
                    return (row, Fingerprint::Sentinel);
                }
                let fp = match self.read_text(row) {
                    Some(content) => {
                        let toks = line_shingles(
                            &content,
                            self.params.shingle_num,
                            self.params.len_limit,
                        );
                        let mut bytes = [0u8; 16];
                        bytes.copy_from_slice(&simhash(&toks, SimHashWidth::F128));
                        Fingerprint::SimHash128(bytes)
                    }
                    None => Fingerprint::Sentinel,
                };
                (row, fp)
            })
            .collect()
    }

    /// 128-bit SimHash over fixed-width byte windows instead of line tokens
    /// (the content variant); the same size gate applies.
    pub fn simhash128_content_all(&self, rows: &[u32]) -> Vec<(u32, Fingerprint)> {
        rows.par_iter()
            .map(|&row| {
                let length = self.dataset.record(row).length;
                if length >= self.params.simhash_max_bytes {
                    return (row, Fingerprint::Sentinel);
                }
                let fp = match self.read_bytes(row) {
                    Some(bytes) => {
                        let windows = fixed_window_shingles(&bytes);
                        let mut key = [0u8; 16];
                        key.copy_from_slice(&simhash(windows, SimHashWidth::F128));
                        Fingerprint::SimHash128(key)
                    }
                    None => Fingerprint::Sentinel,
                };
                (row, fp)
            })
            .collect()
    }

    /// TLSH bodies; blobs at or above the size gate get the sentinel (which
    /// keys as `"0"`).
    pub fn tlsh_all(&self, rows: &[u32]) -> Vec<(u32, Fingerprint)> {
        rows.par_iter()
            .map(|&row| {
                let length = self.dataset.record(row).length;
                if length >= self.params.tlsh_max_bytes {
                    return (row, Fingerprint::Sentinel);
                }
                let fp = match self.read_bytes(row) {
                    Some(bytes) => Fingerprint::Tlsh(tlsh_body(&bytes)),
                    None => Fingerprint::Sentinel,
                };
                (row, fp)
            })
            .collect()
    }

    /// MinHash sketches of width `f` over line shingles; oversized blobs get
    /// the sentinel.
    pub fn minhash_all(&self, rows: &[u32], f: usize) -> Vec<(u32, Fingerprint)> {
        let hasher = crate::hashing::MinHasher::new(f);
        rows.par_iter()
            .map(|&row| {
                let length = self.dataset.record(row).length;
                if length > self.params.graph_max_bytes {
                    return (row, Fingerprint::Sentinel);
                }
                let fp = match self.read_text(row) {
                    Some(content) => {
                        let toks = line_shingles(
                            &content,
                            self.params.shingle_num,
                            self.params.len_limit,
                        );
                        Fingerprint::MinHash(hasher.sketch(&toks))
                    }
                    None => Fingerprint::Sentinel,
                };
                (row, fp)
            })
            .collect()
    }

    /// Packed SimHash of width `width` over line shingles, for the graph
    /// clusterer; oversized blobs get the sentinel.
    pub fn simhash_packed_all(&self, rows: &[u32], width: SimHashWidth) -> Vec<(u32, Fingerprint)> {
        rows.par_iter()
            .map(|&row| {
                let length = self.dataset.record(row).length;
                if length > self.params.graph_max_bytes {
                    return (row, Fingerprint::Sentinel);
                }
                let fp = match self.read_text(row) {
                    Some(content) => {
                        let toks = line_shingles(
                            &content,
                            self.params.shingle_num,
                            self.params.len_limit,
                        );
                        let packed = simhash(&toks, width);
                        match width {
                            SimHashWidth::F128 => {
                                let mut b = [0u8; 16];
                                b.copy_from_slice(&packed);
                                Fingerprint::SimHash128(b)
                            }
                            SimHashWidth::F256 => {
                                let mut b = [0u8; 32];
                                b.copy_from_slice(&packed);
                                Fingerprint::SimHash256(b)
                            }
                        }
                    }
                    None => Fingerprint::Sentinel,
                };
                (row, fp)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_keys() {
        assert_eq!(Fingerprint::Sentinel.simhash128_key(), [0u8; 16]);
        assert_eq!(Fingerprint::Sentinel.tlsh_key(), "0");
        assert_eq!(Fingerprint::Tlsh(String::new()).tlsh_key(), "");
    }

    #[test]
    fn simhash_key_roundtrips() {
        let bytes = [7u8; 16];
        assert_eq!(Fingerprint::SimHash128(bytes).simhash128_key(), bytes);
    }
}
