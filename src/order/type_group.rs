//! Type-aware two-stage grouping.
//!
//! Blobs are partitioned by a pluggable type oracle, then each bucket is
//! permuted independently: big buckets go through a sub-orderer, small ones
//! sort by length. Buckets concatenate in lexicographic label order, which
//! keeps the output deterministic even though labelling runs on the pool.

use crate::cluster::{cluster_order, GraphKind};
use crate::error::Result;
use crate::order::{tlsh_sort_subset, OrderContext};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

/// Label used when a blob exceeds the size gate.
pub const LABEL_TOO_BIG: &str = "too_big";
/// Label used when a blob is below the size gate.
pub const LABEL_TOO_SMALL: &str = "too_small";
/// Label used when a blob cannot be read for sniffing.
pub const LABEL_UNREADABLE: &str = "unreadable";

/// How many leading bytes the oracle sees.
pub const HEAD_BYTES: usize = 4096;

/// A pluggable file-type oracle: returns a string label for a blob given its
/// path and leading bytes.
pub trait TypeOracle: Sync {
    fn label(&self, path: &Path, head: &[u8]) -> String;
}

/// Composes two oracles: when the primary's label contains `pattern`, the
/// secondary is asked instead (content sniffer first, language oracle for
/// anything text-like).
pub struct TwoStageOracle<'a> {
    primary: &'a dyn TypeOracle,
    pattern: &'a str,
    secondary: &'a dyn TypeOracle,
}

impl<'a> TwoStageOracle<'a> {
    #[must_use]
    pub fn new(
        primary: &'a dyn TypeOracle,
        pattern: &'a str,
        secondary: &'a dyn TypeOracle,
    ) -> Self {
        Self {
            primary,
            pattern,
            secondary,
        }
    }
}

impl TypeOracle for TwoStageOracle<'_> {
    fn label(&self, path: &Path, head: &[u8]) -> String {
        let first = self.primary.label(path, head);
        if first.contains(self.pattern) {
            self.secondary.label(path, head)
        } else {
            first
        }
    }
}

/// Sub-orderer applied to buckets that clear the refinement gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSubOrder {
    /// Length descending only
    None,
    /// TLSH body sort
    Tlsh,
    /// MinHash band-collision clustering (f=256, r=64)
    MinHashGraph,
}

/// Partitions a dataset by type label and orders each bucket.
pub struct TypeGrouper<'a> {
    oracle: &'a dyn TypeOracle,
    sub_order: GroupSubOrder,
}

impl<'a> TypeGrouper<'a> {
    #[must_use]
    pub fn new(oracle: &'a dyn TypeOracle, sub_order: GroupSubOrder) -> Self {
        Self { oracle, sub_order }
    }

    /// Label one blob, applying the size gates before the oracle runs.
    fn label_row(&self, ctx: &OrderContext<'_>, row: u32) -> String {
        let rec = ctx.dataset.record(row);
        if rec.length > ctx.params.type_big_bytes {
            return LABEL_TOO_BIG.to_string();
        }
        if rec.length < ctx.params.type_small_bytes {
            return LABEL_TOO_SMALL.to_string();
        }
        let path = ctx.dataset.blob_path(ctx.input_dir, row);
        match read_head(&path) {
            Ok(head) => self.oracle.label(&path, &head),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cannot read blob head for typing");
                LABEL_UNREADABLE.to_string()
            }
        }
    }

    /// Partition the whole dataset into label buckets, preserving manifest
    /// order within each bucket.
    pub fn partition(&self, ctx: &OrderContext<'_>) -> IndexMap<String, Vec<u32>> {
        let n = ctx.dataset.len() as u32;
        let buckets = Mutex::new(IndexMap::<String, Vec<u32>>::new());
        (0..n).into_par_iter().for_each(|row| {
            let label = self.label_row(ctx, row);
            let mut guard = buckets
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            guard.entry(label).or_default().push(row);
        });
        let mut buckets = buckets
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // labelling order is scheduler-dependent; restore manifest order so
        // downstream tie-breaks are deterministic
        for rows in buckets.values_mut() {
            rows.sort_unstable();
        }
        buckets
    }

    /// The full grouped permutation.
    pub fn order(&self, ctx: &OrderContext<'_>) -> Result<Vec<u32>> {
        let buckets = self.partition(ctx);

        let mut labels: Vec<&String> = buckets.keys().collect();
        labels.sort();

        let mut permutation = Vec::with_capacity(ctx.dataset.len());
        for label in labels {
            let rows = &buckets[label];
            let refine = ctx.dataset.subset_bytes(rows) > ctx.params.group_refine_bytes
                && rows.len() > ctx.params.group_refine_members;
            if refine {
                match self.sub_order {
                    GroupSubOrder::None => permutation.extend(length_desc(ctx, rows)),
                    GroupSubOrder::Tlsh => permutation.extend(tlsh_sort_subset(ctx, rows)?),
                    GroupSubOrder::MinHashGraph => permutation.extend(cluster_order(
                        ctx,
                        GraphKind::MinHash { f: 256, r: 64 },
                        rows,
                        true,
                    )?),
                }
            } else {
                permutation.extend(length_desc(ctx, rows));
            }
        }
        Ok(permutation)
    }
}

fn length_desc(ctx: &OrderContext<'_>, rows: &[u32]) -> Vec<u32> {
    let mut out = rows.to_vec();
    out.sort_by_key(|&i| Reverse(ctx.dataset.record(i).length));
    out
}

fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut head = Vec::with_capacity(HEAD_BYTES);
    file.take(HEAD_BYTES as u64).read_to_end(&mut head)?;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOracle(&'static str);

    impl TypeOracle for FixedOracle {
        fn label(&self, _path: &Path, _head: &[u8]) -> String {
            self.0.to_string()
        }
    }

    struct HeadOracle;

    impl TypeOracle for HeadOracle {
        fn label(&self, _path: &Path, head: &[u8]) -> String {
            String::from_utf8_lossy(head).into_owned()
        }
    }

    #[test]
    fn two_stage_defers_on_pattern() {
        let primary = FixedOracle("text/plain");
        let secondary = FixedOracle("rust");
        let oracle = TwoStageOracle::new(&primary, "text", &secondary);
        assert_eq!(oracle.label(Path::new("x"), b""), "rust");

        let binary_primary = FixedOracle("application/zip");
        let oracle = TwoStageOracle::new(&binary_primary, "text", &secondary);
        assert_eq!(oracle.label(Path::new("x"), b""), "application/zip");
    }

    #[test]
    fn two_stage_passes_head_through() {
        let primary = FixedOracle("text");
        let secondary = HeadOracle;
        let oracle = TwoStageOracle::new(&primary, "text", &secondary);
        assert_eq!(oracle.label(Path::new("x"), b"rs"), "rs");
    }
}
