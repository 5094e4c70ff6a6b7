//! Block partitioning and archive naming.

use crate::manifest::Dataset;

/// Split a permutation into contiguous blocks of roughly `target` bytes.
///
/// The target is a soft ceiling: a block closes once its accumulated size
/// reaches the target after including the current blob, so a single blob
/// bigger than the target forms its own block. Concatenating the blocks in
/// order reproduces the permutation exactly.
#[must_use]
pub fn partition(dataset: &Dataset, permutation: &[u32], target: u64) -> Vec<Vec<u32>> {
    debug_assert!(target > 0, "block mode needs a positive target");
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    let mut current_bytes = 0u64;
    for &row in permutation {
        current_bytes += dataset.record(row).length;
        current.push(row);
        if current_bytes >= target {
            blocks.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Block archive filename. The zero-padded index comes first so that
/// lexicographic filename order equals permutation order.
#[must_use]
pub fn archive_filename(
    block_idx: usize,
    dataset_name: &str,
    technique: &str,
    size_gib: u64,
    block_label: &str,
    compressor_name: &str,
) -> String {
    format!(
        "{block_idx:09}_{dataset_name}_{technique}_{size_gib}GiB_block_compressed_{block_label}.tar.{compressor_name}"
    )
}

/// Sidecar manifest filename mapping each blob to its containing archive.
#[must_use]
pub fn sidecar_name(dataset_name: &str, technique: &str, size_gib: u64, block_label: &str) -> String {
    format!("filename_archive_map_{dataset_name}_{technique}_{size_gib}GiB_{block_label}.txt")
}

/// Lines of the sidecar map: `<blob_relative_path> <archive_filename>`, one
/// per blob, in permutation order.
#[must_use]
pub fn archive_map_lines(
    dataset: &Dataset,
    blocks: &[Vec<u32>],
    archive_names: &[String],
) -> Vec<String> {
    let mut lines = Vec::with_capacity(dataset.len());
    for (block, name) in blocks.iter().zip(archive_names) {
        for &row in block {
            lines.push(format!(
                "{} {name}",
                dataset.blob_rel_path(row).display()
            ));
        }
    }
    lines
}
