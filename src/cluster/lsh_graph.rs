//! Banded LSH clustering over blob fingerprints.
//!
//! Two blobs are linked when any band of their sketch/packed hash collides;
//! components are the transitive closure of those links. Collisions are
//! found without an O(k²) scan: per band column, a stable sort brings equal
//! keys adjacent and neighbouring equals are unioned, which yields the same
//! components as exhaustive pairwise comparison.

use crate::cluster::UnionFind;
use crate::fingerprint::{Fingerprint, Fingerprinter, SimHashWidth};
use crate::order::{tlsh_sort_subset, OrderContext};
use crate::Result;

/// Which fingerprint family feeds the band tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// MinHash sketch of `f` coordinates split into `r` bands
    MinHash { f: usize, r: usize },
    /// Packed SimHash split into `r` byte-aligned bands
    SimHash { width: SimHashWidth, r: usize },
}

impl GraphKind {
    fn bands(&self) -> usize {
        match *self {
            Self::MinHash { r, .. } | Self::SimHash { r, .. } => r,
        }
    }

    /// Member-count threshold above which a big component is re-ordered by
    /// TLSH instead of by length.
    fn refine_members(&self, ctx: &OrderContext<'_>) -> usize {
        match self {
            Self::MinHash { .. } => ctx.params.minhash_refine_members,
            Self::SimHash { .. } => ctx.params.simhash_refine_members,
        }
    }
}

/// Band tuple for one blob: `r` opaque byte keys, or `None` for blobs that
/// were skipped (size gate or read failure). Skipped blobs stay singleton
/// components; a shared "skipped" key would glue unrelated blobs together.
type Bands = Option<Vec<Vec<u8>>>;

fn minhash_bands(sketch: &[u32], r: usize) -> Vec<Vec<u8>> {
    let b = sketch.len() / r;
    sketch
        .chunks_exact(b)
        .take(r)
        .map(|chunk| chunk.iter().flat_map(|v| v.to_be_bytes()).collect())
        .collect()
}

fn packed_bands(packed: &[u8], r: usize) -> Vec<Vec<u8>> {
    let b = packed.len() / r;
    packed
        .chunks_exact(b)
        .take(r)
        .map(<[u8]>::to_vec)
        .collect()
}

fn band_tuples(ctx: &OrderContext<'_>, kind: GraphKind, rows: &[u32]) -> Vec<Bands> {
    let fp = Fingerprinter::new(ctx.dataset, ctx.input_dir, &ctx.params);
    let fingerprints = match kind {
        GraphKind::MinHash { f, .. } => fp.minhash_all(rows, f),
        GraphKind::SimHash { width, .. } => fp.simhash_packed_all(rows, width),
    };
    let r = kind.bands();
    fingerprints
        .into_iter()
        .map(|(_, fingerprint)| match fingerprint {
            Fingerprint::MinHash(sketch) => Some(minhash_bands(&sketch, r)),
            Fingerprint::SimHash128(bytes) => Some(packed_bands(&bytes, r)),
            Fingerprint::SimHash256(bytes) => Some(packed_bands(&bytes, r)),
            _ => None,
        })
        .collect()
}

/// Cluster `rows` into band-collision components. Returned components hold
/// dataset indices, ordered by ascending component root then ascending
/// position within `rows`.
pub fn cluster_components(
    ctx: &OrderContext<'_>,
    kind: GraphKind,
    rows: &[u32],
) -> Result<Vec<Vec<u32>>> {
    let tuples = band_tuples(ctx, kind, rows);
    let r = kind.bands();

    let mut uf = UnionFind::new(rows.len());
    let mut order: Vec<usize> = (0..rows.len()).collect();
    for k in 0..r {
        // stable, so equal keys keep their running relative order
        order.sort_by(|&a, &b| {
            let ka = tuples[a].as_ref().map(|bands| bands[k].as_slice());
            let kb = tuples[b].as_ref().map(|bands| bands[k].as_slice());
            ka.cmp(&kb)
        });
        for pair in order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            match (&tuples[a], &tuples[b]) {
                (Some(ba), Some(bb)) if ba[k] == bb[k] => uf.union(a, b),
                _ => {}
            }
        }
    }

    Ok(uf
        .components()
        .into_iter()
        .map(|members| members.into_iter().map(|li| rows[li]).collect())
        .collect())
}

/// Order `rows` by LSH-graph clustering.
///
/// Components totalling more than the refinement byte threshold with enough
/// members are re-ordered by TLSH; smaller ones sort by length descending.
/// With `guard_small` set (the sub-orderer path), inputs too small to
/// cluster profitably skip straight to a length sort.
pub fn cluster_order(
    ctx: &OrderContext<'_>,
    kind: GraphKind,
    rows: &[u32],
    guard_small: bool,
) -> Result<Vec<u32>> {
    if guard_small
        && (rows.len() < 3 || ctx.dataset.subset_bytes(rows) < ctx.params.component_refine_bytes)
    {
        return Ok(length_desc(ctx, rows));
    }

    let components = cluster_components(ctx, kind, rows)?;
    let refine_members = kind.refine_members(ctx);

    let mut ordered = Vec::with_capacity(rows.len());
    for members in components {
        let total = ctx.dataset.subset_bytes(&members);
        if total > ctx.params.component_refine_bytes && members.len() > refine_members {
            ordered.extend(tlsh_sort_subset(ctx, &members)?);
        } else {
            ordered.extend(length_desc(ctx, &members));
        }
    }

    // The 256-bit SimHash variant of the original pipeline returned its
    // input unpermuted; the toggle reproduces that for conformance runs.
    if ctx.params.sim256_passthrough
        && matches!(
            kind,
            GraphKind::SimHash {
                width: SimHashWidth::F256,
                ..
            }
        )
    {
        return Ok(rows.to_vec());
    }

    Ok(ordered)
}

fn length_desc(ctx: &OrderContext<'_>, rows: &[u32]) -> Vec<u32> {
    let mut out = rows.to_vec();
    out.sort_by_key(|&i| std::cmp::Reverse(ctx.dataset.record(i).length));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minhash_bands_split_evenly() {
        let sketch: Vec<u32> = (0..256).collect();
        let bands = minhash_bands(&sketch, 64);
        assert_eq!(bands.len(), 64);
        assert!(bands.iter().all(|b| b.len() == 16));
        // first band = first 4 coordinates, big-endian
        assert_eq!(&bands[0][..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn packed_bands_split_evenly() {
        let packed: Vec<u8> = (0..16).collect();
        let bands = packed_bands(&packed, 8);
        assert_eq!(bands.len(), 8);
        assert_eq!(bands[0], vec![0, 1]);
        assert_eq!(bands[7], vec![14, 15]);
    }

    #[test]
    fn equal_bands_collide_distinct_do_not() {
        // Exercise the sort-and-union core directly on synthetic tuples.
        let tuples: Vec<Bands> = vec![
            Some(vec![vec![1, 1], vec![9, 9]]),
            Some(vec![vec![2, 2], vec![9, 9]]),
            Some(vec![vec![3, 3], vec![4, 4]]),
            None,
            None,
        ];
        let mut uf = UnionFind::new(tuples.len());
        let mut order: Vec<usize> = (0..tuples.len()).collect();
        for k in 0..2 {
            order.sort_by(|&a, &b| {
                let ka = tuples[a].as_ref().map(|bands| bands[k].as_slice());
                let kb = tuples[b].as_ref().map(|bands| bands[k].as_slice());
                ka.cmp(&kb)
            });
            for pair in order.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                match (&tuples[a], &tuples[b]) {
                    (Some(ba), Some(bb)) if ba[k] == bb[k] => uf.union(a, b),
                    _ => {}
                }
            }
        }
        assert!(uf.connected(0, 1), "shared second band must link 0 and 1");
        assert!(!uf.connected(0, 2));
        // skipped blobs stay singletons even though both were skipped
        assert!(!uf.connected(3, 4));
    }
}
