//! End-to-end archive harness tests.
//!
//! These drive the real `tar` binary with gzip as the compressor; when
//! either tool is missing the tests skip with a notice instead of failing.

mod common;

use common::toy_workspace;
use ppc_bench::archive::{tar_create, tar_extract, Compressor};
use ppc_bench::config::{BenchConfig, BlockSize};
use ppc_bench::{run_point, BenchmarkPoint};
use std::process::Command;

fn have_tools() -> bool {
    let ok = |cmd: &str| {
        Command::new(cmd)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    };
    ok(ppc_bench::archive::tar_binary()) && ok("gzip")
}

macro_rules! require_tools {
    () => {
        if !have_tools() {
            eprintln!("skipping: tar/gzip not available");
            return;
        }
    };
}

fn config(ws: &common::ToyWorkspace, keep: bool) -> BenchConfig {
    BenchConfig {
        input_dir: ws.input_dir.clone(),
        output_dir: ws.output_dir.clone(),
        keep_archives: keep,
        threads: 4,
        verbose: false,
    }
}

#[test]
fn round_trip_preserves_blob_bytes() {
    require_tools!();
    let ws = toy_workspace();
    let compressor = Compressor::parse("gzip");

    let work = ws.tmp.path().join("roundtrip");
    std::fs::create_dir_all(&work).expect("create work dir");

    let list_file = work.join("list.txt");
    let listing: String = (0..8u32)
        .map(|i| format!("{}\n", ws.dataset.blob_rel_path(i).display()))
        .collect();
    std::fs::write(&list_file, listing).expect("write list");

    let archive = work.join("toy.tar.gz");
    tar_create(&archive, &ws.input_dir, &list_file, &compressor).expect("tar create");
    assert!(archive.is_file());

    let extracted = work.join("extracted");
    std::fs::create_dir_all(&extracted).expect("create extract dir");
    tar_extract(&archive, &extracted, &compressor).expect("tar extract");

    for i in 0..8u32 {
        let rel = ws.dataset.blob_rel_path(i);
        let original = std::fs::read(ws.input_dir.join(&rel)).expect("read original");
        let recovered = std::fs::read(extracted.join(&rel)).expect("read extracted");
        assert_eq!(original, recovered, "blob {rel:?} changed in the round trip");
    }
}

#[test]
fn single_archive_point_reports_sane_metrics() {
    require_tools!();
    let ws = toy_workspace();
    let config = config(&ws, false);
    let compressor = Compressor::parse("gzip");
    let block_size = BlockSize::single();
    let permutation: Vec<u32> = (0..8).collect();

    let record = run_point(&BenchmarkPoint {
        dataset: &ws.dataset,
        permutation: &permutation,
        technique: "list_order",
        notes: "None",
        ordering_time: 0.0,
        compressor: &compressor,
        block_size: &block_size,
        config: &config,
    })
    .expect("benchmark point");

    assert_eq!(record.technique, "list_order+gzip");
    assert_eq!(record.num_blobs, 8);
    assert!(record.ratio_percent > 0.0, "compressed size must be positive");
    assert!(
        record.ratio_percent < 100.0,
        "this dataset compresses: got {}",
        record.ratio_percent
    );
    assert!(record.block.is_none());
    assert_eq!(record.notes, "None");

    // the working directory is gone after the point
    let leftovers: Vec<_> = std::fs::read_dir(&ws.output_dir)
        .expect("read output dir")
        .collect();
    assert!(leftovers.is_empty(), "working dir leaked: {leftovers:?}");
}

#[test]
fn block_mode_keeps_archives_and_sidecar_map() {
    require_tools!();
    let ws = toy_workspace();
    let config = config(&ws, true);
    let compressor = Compressor::parse("gzip");
    let block_size = BlockSize::parse("16KiB").expect("block size");
    let permutation: Vec<u32> = (0..8).collect();

    let record = run_point(&BenchmarkPoint {
        dataset: &ws.dataset,
        permutation: &permutation,
        technique: "list_order",
        notes: "None",
        ordering_time: 0.0,
        compressor: &compressor,
        block_size: &block_size,
        config: &config,
    })
    .expect("benchmark point");

    let block = record.block.expect("block metrics in block mode");
    assert!(block.per_block_ms >= 0.0);
    assert!(block.throughput > 0.0);
    assert_eq!(record.notes, "block_size=16KiB");

    let mut archives: Vec<String> = std::fs::read_dir(&ws.output_dir)
        .expect("read output dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tar.gzip"))
        .collect();
    archives.sort();
    assert!(
        archives.len() >= 2,
        "a 16KiB target over ~76KiB of blobs needs several blocks: {archives:?}"
    );
    assert!(archives[0].starts_with("000000000_toy_list_order_"));

    let sidecar = std::fs::read_dir(&ws.output_dir)
        .expect("read output dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("filename_archive_map_"))
                .unwrap_or(false)
        })
        .expect("sidecar map exists");
    let map = std::fs::read_to_string(sidecar).expect("read sidecar");
    let lines: Vec<&str> = map.lines().collect();
    assert_eq!(lines.len(), 8, "one sidecar line per blob");
    for i in 0..8u32 {
        let rel = ws.dataset.blob_rel_path(i).display().to_string();
        assert_eq!(
            lines.iter().filter(|l| l.starts_with(&rel)).count(),
            1,
            "blob {rel} must appear exactly once"
        );
        let archive_name = lines
            .iter()
            .find(|l| l.starts_with(&rel))
            .and_then(|l| l.split(' ').nth(1))
            .expect("archive column");
        assert!(
            archives.contains(&archive_name.to_string()),
            "sidecar references kept archive {archive_name}"
        );
    }
}

#[test]
fn failing_compressor_fails_the_point_cleanly() {
    require_tools!();
    let ws = toy_workspace();
    let config = config(&ws, false);
    // `false` exists everywhere and always exits nonzero
    let compressor = Compressor::parse("false");
    let block_size = BlockSize::single();
    let permutation: Vec<u32> = (0..8).collect();

    let err = run_point(&BenchmarkPoint {
        dataset: &ws.dataset,
        permutation: &permutation,
        technique: "list_order",
        notes: "None",
        ordering_time: 0.0,
        compressor: &compressor,
        block_size: &block_size,
        config: &config,
    })
    .expect_err("broken compressor must fail the point");
    assert!(err.to_string().contains("Archive"), "unexpected error: {err}");

    // even on failure the working directory is cleaned up
    let leftovers: Vec<_> = std::fs::read_dir(&ws.output_dir)
        .expect("read output dir")
        .collect();
    assert!(leftovers.is_empty(), "working dir leaked on failure");
}
