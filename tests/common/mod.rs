//! Shared fixtures: a small on-disk dataset with known similarity structure.

// not every test binary uses every helper
#![allow(dead_code)]

use ppc_bench::manifest::{BlobRecord, Dataset};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::path::PathBuf;

/// An on-disk workspace: four near-duplicate text blobs plus four unrelated
/// binary blobs, laid out `<input_dir>/<local_path>/<file_id>`.
pub struct ToyWorkspace {
    /// Owns the on-disk tree; dropping it cleans up
    pub tmp: tempfile::TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dataset: Dataset,
}

/// Indices of the near-duplicate blobs in the toy dataset.
pub const DUP_ROWS: [u32; 4] = [0, 1, 2, 3];
/// Indices of the unrelated binary blobs.
pub const RANDOM_ROWS: [u32; 4] = [4, 5, 6, 7];

fn base_lines() -> Vec<String> {
    (0..1000)
        .map(|i| format!("line {i:04}: the quick brown fox jumps over the lazy dog {}", i * 31))
        .collect()
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

pub fn toy_workspace() -> ToyWorkspace {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let input_dir = tmp.path().join("blobs");
    let output_dir = tmp.path().join("out");
    std::fs::create_dir_all(&output_dir).expect("create output dir");

    let base = base_lines();
    let mut edit_early = base.clone();
    edit_early[7] = "line 0007: a slightly different seventh line".to_string();
    let mut edit_late = base.clone();
    edit_late[100] = "line 0100: this hundredth line was rewritten".to_string();
    let mut appended = base.clone();
    appended.push("one extra trailing line closes this file".to_string());

    let blobs: Vec<(&str, Vec<u8>)> = vec![
        ("dupaa01", base.join("\n").into_bytes()),
        ("dupab02", edit_early.join("\n").into_bytes()),
        ("dupac03", edit_late.join("\n").into_bytes()),
        ("dupad04", appended.join("\n").into_bytes()),
        ("rndba01", random_bytes(101, 4096)),
        ("rndbb02", random_bytes(102, 4096)),
        ("rndbc03", random_bytes(103, 4096)),
        ("rndbd04", random_bytes(104, 4096)),
    ];

    let mut records = Vec::new();
    for (file_id, content) in &blobs {
        let local_path = &file_id[..2];
        let dir = input_dir.join(local_path);
        std::fs::create_dir_all(&dir).expect("create blob dir");
        std::fs::write(dir.join(file_id), content).expect("write blob");
        records.push(BlobRecord {
            swhid: format!("swh:1:cnt:{file_id}"),
            file_id: (*file_id).to_string(),
            length: content.len() as u64,
            local_path: local_path.to_string(),
            filename: format!("{file_id}.txt"),
            filepath: format!("repo/src/{file_id}.txt"),
        });
    }

    ToyWorkspace {
        tmp,
        input_dir,
        output_dir,
        dataset: Dataset::new("toy", records),
    }
}

/// Positions of `rows` within `perm`.
pub fn positions(perm: &[u32], rows: &[u32]) -> Vec<usize> {
    rows.iter()
        .map(|row| perm.iter().position(|r| r == row).expect("row in perm"))
        .collect()
}
