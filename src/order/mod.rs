//! Permutation strategies.
//!
//! Every strategy maps a dataset to a permutation of its index set. Sort-based
//! strategies use stable sorts throughout, so equal keys preserve their
//! original relative order; graph strategies delegate to the LSH clusterer.

mod type_group;

pub use type_group::{GroupSubOrder, TwoStageOracle, TypeGrouper, TypeOracle};

use crate::cluster::{cluster_order, GraphKind};
use crate::error::{PpcError, Result};
use crate::fingerprint::{Fingerprinter, SimHashWidth, DEFAULT_LEN_LIMIT};
use crate::manifest::Dataset;
use crate::oracle::{ContentSniffer, ExtensionLangOracle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::path::Path;

/// Seed for the `random` permuter and the decompression sample.
pub const RANDOM_SEED: u64 = 42;

/// Tunable thresholds of the permutation engine. The defaults are the
/// contract values; they exist as fields so experiments can vary them.
#[derive(Debug, Clone)]
pub struct OrderParams {
    /// Minimum raw line length for a line token
    pub len_limit: usize,
    /// Consecutive lines grouped into one token
    pub shingle_num: usize,
    /// SimHash sort skips files at or above this size
    pub simhash_max_bytes: u64,
    /// TLSH skips files at or above this size
    pub tlsh_max_bytes: u64,
    /// Graph clusterers skip files above this size
    pub graph_max_bytes: u64,
    /// Component byte total above which TLSH refinement kicks in
    pub component_refine_bytes: u64,
    /// Member count gate for refining MinHash-graph components
    pub minhash_refine_members: usize,
    /// Member count gate for refining SimHash-graph components
    pub simhash_refine_members: usize,
    /// Type-bucket byte total above which the sub-orderer runs
    pub group_refine_bytes: u64,
    /// Type-bucket member count gate for the sub-orderer
    pub group_refine_members: usize,
    /// Files above this size are labelled `too_big` without asking the oracle
    pub type_big_bytes: u64,
    /// Files below this size are labelled `too_small` without asking the oracle
    pub type_small_bytes: u64,
    /// Reproduce the original pipeline's SimHash-256 unpermuted return
    pub sim256_passthrough: bool,
}

impl Default for OrderParams {
    fn default() -> Self {
        Self {
            len_limit: DEFAULT_LEN_LIMIT,
            shingle_num: 1,
            simhash_max_bytes: 1 << 20,
            tlsh_max_bytes: 1 << 22,
            graph_max_bytes: 1 << 20,
            component_refine_bytes: 32 << 20,
            minhash_refine_members: 3,
            simhash_refine_members: 5,
            group_refine_bytes: 2 << 20,
            group_refine_members: 3,
            type_big_bytes: 1 << 20,
            type_small_bytes: 200,
            sim256_passthrough: false,
        }
    }
}

/// Everything an ordering call needs: the dataset, where its blobs live, and
/// the engine thresholds.
#[derive(Debug)]
pub struct OrderContext<'a> {
    pub dataset: &'a Dataset,
    pub input_dir: &'a Path,
    pub params: OrderParams,
}

/// The permutation strategies exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// No permutation, manifest order
    #[value(name = "list")]
    List,
    /// Pseudo-random permutation with a fixed seed
    #[value(name = "random")]
    Random,
    /// Sort by length, biggest first
    #[value(name = "lengthsort")]
    Lengthsort,
    /// Sort by reversed filename, so extension comes first
    #[value(name = "filename")]
    Filename,
    /// Sort by reversed filepath
    #[value(name = "filename-path")]
    FilenamePath,
    /// Sort by 128-bit SimHash over line tokens
    #[value(name = "simhashsort")]
    Simhashsort,
    /// Sort by 128-bit SimHash over raw byte windows
    #[value(name = "simhashsort-content")]
    SimhashsortContent,
    /// Sort by TLSH body
    #[value(name = "tlshsort")]
    Tlshsort,
    /// MinHash band-collision clustering (f=256, r=64)
    #[value(name = "minhashgraph")]
    Minhashgraph,
    /// SimHash band-collision clustering (f=128, r=8)
    #[value(name = "simhashgraph")]
    Simhashgraph,
    /// SimHash band-collision clustering (f=256, r=8)
    #[value(name = "simhashgraph256")]
    Simhashgraph256,
    /// Group by type oracle, length-sort each group
    #[value(name = "typesort")]
    Typesort,
    /// Group by type oracle, TLSH-sort big groups
    #[value(name = "typetlshsort")]
    Typetlshsort,
    /// Group by type oracle, MinHash-graph big groups
    #[value(name = "typeminhashgraph")]
    Typeminhashgraph,
    /// Two-stage oracle (content, then language for text), MinHash-graph groups
    #[value(name = "typelangminhashgraph")]
    Typelangminhashgraph,
    /// Run every strategy above
    #[value(name = "all")]
    All,
}

impl Strategy {
    /// Every concrete strategy, in the order `all` runs them.
    #[must_use]
    pub fn all_concrete() -> Vec<Self> {
        vec![
            Self::Random,
            Self::List,
            Self::Lengthsort,
            Self::Filename,
            Self::FilenamePath,
            Self::Simhashsort,
            Self::SimhashsortContent,
            Self::Tlshsort,
            Self::Minhashgraph,
            Self::Simhashgraph,
            Self::Simhashgraph256,
            Self::Typesort,
            Self::Typetlshsort,
            Self::Typeminhashgraph,
            Self::Typelangminhashgraph,
        ]
    }

    /// Technique label used in reports and archive filenames.
    #[must_use]
    pub fn technique_name(self) -> &'static str {
        match self {
            Self::List => "list_order",
            Self::Random => "random_order",
            Self::Lengthsort => "length_sort",
            Self::Filename => "filename_sort",
            Self::FilenamePath => "filename+path_sort",
            Self::Simhashsort => "simhash_sort",
            Self::SimhashsortContent => "simhash_sort_content",
            Self::Tlshsort => "tlsh_sort",
            Self::Minhashgraph => "minhash_graph_tlshsort_uf_f256_r64",
            Self::Simhashgraph => "simhash_graph_uf_f128_r8",
            Self::Simhashgraph256 => "simhash_graph_uf_f256_r8",
            Self::Typesort => "typesort",
            Self::Typetlshsort => "typetlshsort",
            Self::Typeminhashgraph => "typeminhashgraph",
            Self::Typelangminhashgraph => "typelangminhashgraph",
            Self::All => "all",
        }
    }

    /// Parameter notes for the NOTES column.
    #[must_use]
    pub fn notes(self) -> &'static str {
        match self {
            Self::Minhashgraph => "f256_r64",
            Self::Simhashgraph => "f128_r8",
            Self::Simhashgraph256 => "f256_r8",
            _ => "None",
        }
    }
}

/// Compute the permutation for `strategy`. Type strategies use the built-in
/// oracles; callers needing a custom oracle go through [`TypeGrouper`]
/// directly.
pub fn order(strategy: Strategy, ctx: &OrderContext<'_>) -> Result<Vec<u32>> {
    let n = ctx.dataset.len();
    let all: Vec<u32> = (0..n as u32).collect();
    let sniffer = ContentSniffer;
    let lang = ExtensionLangOracle;

    let perm = match strategy {
        Strategy::List => list_order(n),
        Strategy::Random => random_order(n),
        Strategy::Lengthsort => length_sort(ctx.dataset),
        Strategy::Filename => filename_sort(ctx.dataset),
        Strategy::FilenamePath => filepath_sort(ctx.dataset),
        Strategy::Simhashsort => simhash_sort(ctx),
        Strategy::SimhashsortContent => simhash_content_sort(ctx),
        Strategy::Tlshsort => tlsh_sort_subset(ctx, &all)?,
        Strategy::Minhashgraph => {
            cluster_order(ctx, GraphKind::MinHash { f: 256, r: 64 }, &all, false)?
        }
        Strategy::Simhashgraph => cluster_order(
            ctx,
            GraphKind::SimHash {
                width: SimHashWidth::F128,
                r: 8,
            },
            &all,
            false,
        )?,
        Strategy::Simhashgraph256 => cluster_order(
            ctx,
            GraphKind::SimHash {
                width: SimHashWidth::F256,
                r: 8,
            },
            &all,
            false,
        )?,
        Strategy::Typesort => TypeGrouper::new(&sniffer, GroupSubOrder::None).order(ctx)?,
        Strategy::Typetlshsort => TypeGrouper::new(&sniffer, GroupSubOrder::Tlsh).order(ctx)?,
        Strategy::Typeminhashgraph => {
            TypeGrouper::new(&sniffer, GroupSubOrder::MinHashGraph).order(ctx)?
        }
        Strategy::Typelangminhashgraph => {
            let oracle = TwoStageOracle::new(&sniffer, "text", &lang);
            TypeGrouper::new(&oracle, GroupSubOrder::MinHashGraph).order(ctx)?
        }
        Strategy::All => {
            return Err(PpcError::config(
                "`all` must be expanded into concrete strategies before ordering",
            ))
        }
    };
    verify_permutation(&perm, n);
    Ok(perm)
}

/// Identity permutation: manifest order.
#[must_use]
pub fn list_order(n: usize) -> Vec<u32> {
    (0..n as u32).collect()
}

/// Fixed-seed pseudo-random permutation.
#[must_use]
pub fn random_order(n: usize) -> Vec<u32> {
    let mut perm = list_order(n);
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
    perm.shuffle(&mut rng);
    perm
}

/// Length descending, original order on ties.
#[must_use]
pub fn length_sort(dataset: &Dataset) -> Vec<u32> {
    let mut perm = list_order(dataset.len());
    perm.sort_by_key(|&i| Reverse(dataset.record(i).length));
    perm
}

/// Reversed filename ascending (extension first), then length descending.
#[must_use]
pub fn filename_sort(dataset: &Dataset) -> Vec<u32> {
    let mut perm = list_order(dataset.len());
    perm.sort_by_cached_key(|&i| {
        let rec = dataset.record(i);
        (
            rec.filename.chars().rev().collect::<String>(),
            Reverse(rec.length),
        )
    });
    perm
}

/// Reversed filepath ascending, then length descending.
#[must_use]
pub fn filepath_sort(dataset: &Dataset) -> Vec<u32> {
    let mut perm = list_order(dataset.len());
    perm.sort_by_cached_key(|&i| {
        let rec = dataset.record(i);
        (
            rec.filepath.chars().rev().collect::<String>(),
            Reverse(rec.length),
        )
    });
    perm
}

/// Ascending 128-bit SimHash; gated and unreadable blobs key as zero and so
/// stay at the front in their original order.
#[must_use]
pub fn simhash_sort(ctx: &OrderContext<'_>) -> Vec<u32> {
    let all = list_order(ctx.dataset.len());
    let fp = Fingerprinter::new(ctx.dataset, ctx.input_dir, &ctx.params);
    let mut keyed = fp.simhash128_all(&all);
    keyed.sort_by_key(|(_, fingerprint)| fingerprint.simhash128_key());
    keyed.into_iter().map(|(row, _)| row).collect()
}

/// Ascending 128-bit SimHash over fixed-width byte windows instead of line
/// tokens; gated and unreadable blobs key as zero, as in [`simhash_sort`].
#[must_use]
pub fn simhash_content_sort(ctx: &OrderContext<'_>) -> Vec<u32> {
    let all = list_order(ctx.dataset.len());
    let fp = Fingerprinter::new(ctx.dataset, ctx.input_dir, &ctx.params);
    let mut keyed = fp.simhash128_content_all(&all);
    keyed.sort_by_key(|(_, fingerprint)| fingerprint.simhash128_key());
    keyed.into_iter().map(|(row, _)| row).collect()
}

/// Order a subset of rows by ascending TLSH body. Also serves as the
/// refinement pass for big LSH components and type buckets.
pub fn tlsh_sort_subset(ctx: &OrderContext<'_>, rows: &[u32]) -> Result<Vec<u32>> {
    let fp = Fingerprinter::new(ctx.dataset, ctx.input_dir, &ctx.params);
    let mut keyed = fp.tlsh_all(rows);
    keyed.sort_by(|(_, a), (_, b)| a.tlsh_key().cmp(b.tlsh_key()));
    Ok(keyed.into_iter().map(|(row, _)| row).collect())
}

/// True when `perm` is a permutation of `[0, n)`.
#[must_use]
pub fn is_permutation(perm: &[u32], n: usize) -> bool {
    if perm.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &i in perm {
        let Some(slot) = seen.get_mut(i as usize) else {
            return false;
        };
        if *slot {
            return false;
        }
        *slot = true;
    }
    true
}

/// Symmetric difference between `perm` and `[0, n)`: indices missing from
/// the output plus foreign or duplicated values.
#[must_use]
pub fn permutation_diff(perm: &[u32], n: usize) -> Vec<u32> {
    let mut count = vec![0usize; n];
    let mut diff = Vec::new();
    for &i in perm {
        match count.get_mut(i as usize) {
            Some(c) => *c += 1,
            None => diff.push(i),
        }
    }
    for (i, &c) in count.iter().enumerate() {
        if c != 1 {
            diff.push(i as u32);
        }
    }
    diff
}

/// Debug-build check that an orderer produced a real permutation.
pub fn verify_permutation(perm: &[u32], n: usize) {
    debug_assert!(
        is_permutation(perm, n),
        "orderer output is not a permutation of [0, {n}): symmetric difference {:?}",
        permutation_diff(perm, n)
    );
}
