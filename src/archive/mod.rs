//! The archive harness: build archives from a permutation, measure
//! compression and decompression, derive the benchmark metrics.
//!
//! Each benchmark point gets an exclusive working directory under the output
//! dir, named with the technique, compressor, dataset and PID. The directory
//! is a scoped temp dir, so it is removed on every exit path, including
//! failures part-way through.

mod blocks;
mod tar;

pub use blocks::{archive_filename, archive_map_lines, partition, sidecar_name};
pub use tar::{tar_binary, tar_create, tar_extract, Compressor};

use crate::config::{BenchConfig, BlockSize};
use crate::error::{ArchiveErrorKind, ErrorContext, PpcError, Result};
use crate::manifest::Dataset;
use crate::order::{verify_permutation, RANDOM_SEED};
use crate::report::{BenchmarkRecord, BlockMetrics};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

/// Fraction of blocks decompressed to estimate full decompression time.
const DECOMPRESSION_SAMPLE: f64 = 0.10;

/// One (dataset, permutation, compressor, block-size) benchmark point.
#[derive(Debug)]
pub struct BenchmarkPoint<'a> {
    pub dataset: &'a Dataset,
    pub permutation: &'a [u32],
    /// Technique label for filenames and the TECHNIQUE column
    pub technique: &'a str,
    /// Parameter notes for the NOTES column (`None` when there are none)
    pub notes: &'a str,
    pub ordering_time: f64,
    pub compressor: &'a Compressor,
    pub block_size: &'a BlockSize,
    pub config: &'a BenchConfig,
}

impl BenchmarkPoint<'_> {
    fn size_gib_rounded(&self) -> u64 {
        (self.dataset.total_bytes() as f64 / (1u64 << 30) as f64).round() as u64
    }

    fn base_record(&self) -> BenchmarkRecord {
        BenchmarkRecord {
            dataset: self.dataset.name().to_string(),
            num_blobs: self.dataset.len(),
            total_bytes: self.dataset.total_bytes(),
            mean_bytes: self.dataset.mean_bytes(),
            median_bytes: self.dataset.median_bytes(),
            technique: format!("{}+{}", self.technique, self.compressor.name()),
            ratio_percent: 0.0,
            ordering_time: self.ordering_time,
            compression_time: 0.0,
            compression_speed: 0.0,
            decompression_speed: 0.0,
            block: None,
            notes: self.notes.to_string(),
        }
    }

    fn workdir(&self) -> Result<tempfile::TempDir> {
        tempfile::Builder::new()
            .prefix(&format!(
                "tmp.ppc_{}_{}_{}_{}.",
                self.technique,
                self.compressor.name(),
                self.dataset.name(),
                std::process::id()
            ))
            .tempdir_in(&self.config.output_dir)
            .map_err(|e| {
                PpcError::archive(
                    "benchmark pass setup",
                    ArchiveErrorKind::WorkingDir(e.to_string()),
                )
            })
    }
}

/// Run one benchmark point end to end and return its record.
pub fn run_point(point: &BenchmarkPoint<'_>) -> Result<BenchmarkRecord> {
    verify_permutation(point.permutation, point.dataset.len());
    if point.block_size.is_single() {
        run_single(point)
    } else {
        run_blocks(point)
    }
}

fn write_list_file(
    path: &Path,
    dataset: &Dataset,
    rows: &[u32],
) -> Result<()> {
    let mut contents = String::new();
    for &row in rows {
        contents.push_str(&dataset.blob_rel_path(row).to_string_lossy());
        contents.push('\n');
    }
    std::fs::write(path, contents).map_err(|e| PpcError::io(path, e))
}

fn run_single(point: &BenchmarkPoint<'_>) -> Result<BenchmarkRecord> {
    let workdir = point.workdir()?;
    let dir = workdir.path();

    let list_file = dir.join("list_files_compression.txt");
    write_list_file(&list_file, point.dataset, point.permutation)?;

    let archive = dir.join(format!(
        "{}_{}_{}GiB.tar.{}",
        point.dataset.name(),
        point.technique,
        point.size_gib_rounded(),
        point.compressor.name()
    ));

    let started = Instant::now();
    tar_create(&archive, &point.config.input_dir, &list_file, point.compressor)
        .context("building the single archive")?;
    let compression_time = started.elapsed().as_secs_f64();

    let compressed = std::fs::metadata(&archive)
        .map_err(|e| PpcError::io(&archive, e))?
        .len();
    std::fs::remove_file(&list_file).map_err(|e| PpcError::io(&list_file, e))?;

    let started = Instant::now();
    tar_extract(&archive, dir, point.compressor)?;
    let decompression_time = started.elapsed().as_secs_f64();

    if point.config.keep_archives {
        keep_archive(&archive, &point.config.output_dir)?;
    }

    let mut record = point.base_record();
    record.ratio_percent = compressed as f64 / point.dataset.total_bytes() as f64 * 100.0;
    record.compression_time = compression_time;
    (record.compression_speed, record.decompression_speed) = BenchmarkRecord::speeds(
        point.dataset.total_bytes(),
        point.ordering_time,
        compression_time,
        decompression_time,
    );
    Ok(record)
}

fn run_blocks(point: &BenchmarkPoint<'_>) -> Result<BenchmarkRecord> {
    let workdir = point.workdir()?;
    let dir = workdir.path();

    let plan = partition(point.dataset, point.permutation, point.block_size.bytes());
    let archive_names: Vec<String> = (0..plan.len())
        .map(|idx| {
            archive_filename(
                idx,
                point.dataset.name(),
                point.technique,
                point.size_gib_rounded(),
                point.block_size.label(),
                point.compressor.name(),
            )
        })
        .collect();

    tracing::debug!(
        blocks = plan.len(),
        target = point.block_size.label(),
        "dispatching block compression"
    );

    let started = Instant::now();
    plan.par_iter()
        .zip(archive_names.par_iter())
        .enumerate()
        .try_for_each(|(idx, (rows, name))| {
            let list_file = dir.join(format!("list_files_block_{idx:010}.txt"));
            write_list_file(&list_file, point.dataset, rows)?;
            tar_create(
                &dir.join(name),
                &point.config.input_dir,
                &list_file,
                point.compressor,
            )
            .with_context(|| format!("compressing block {idx}"))
        })?;
    let compression_time = started.elapsed().as_secs_f64();

    let mut compressed = 0u64;
    for name in &archive_names {
        let path = dir.join(name);
        compressed += std::fs::metadata(&path)
            .map_err(|e| PpcError::io(&path, e))?
            .len();
    }

    // Decompress a seeded sample of the blocks and extrapolate, always at
    // least one block so tiny runs still measure something
    let sample_count = ((plan.len() as f64 * DECOMPRESSION_SAMPLE) as usize).max(1);
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
    let sampled: Vec<usize> = rand::seq::index::sample(&mut rng, plan.len(), sample_count).into_vec();

    let started = Instant::now();
    sampled.par_iter().try_for_each(|&idx| {
        tar_extract(&dir.join(&archive_names[idx]), dir, point.compressor)
            .with_context(|| format!("decompressing block {idx}"))
    })?;
    let sample_time = started.elapsed().as_secs_f64();
    let decompression_time = sample_time / DECOMPRESSION_SAMPLE;
    let per_block_ms = sample_time / sample_count as f64 * 1000.0;

    if point.config.keep_archives {
        archive_names
            .par_iter()
            .try_for_each(|name| keep_archive(&dir.join(name), &point.config.output_dir))?;
        let sidecar = point.config.output_dir.join(sidecar_name(
            point.dataset.name(),
            point.technique,
            point.size_gib_rounded(),
            point.block_size.label(),
        ));
        let lines = archive_map_lines(point.dataset, &plan, &archive_names);
        std::fs::write(&sidecar, lines.join("\n") + "\n")
            .map_err(|e| PpcError::io(&sidecar, e))?;
    }

    let mut record = point.base_record();
    record.ratio_percent = compressed as f64 / point.dataset.total_bytes() as f64 * 100.0;
    record.compression_time = compression_time;
    (record.compression_speed, record.decompression_speed) = BenchmarkRecord::speeds(
        point.dataset.total_bytes(),
        point.ordering_time,
        compression_time,
        decompression_time,
    );
    record.block = Some(BlockMetrics {
        per_block_ms,
        throughput: point.dataset.len() as f64 / decompression_time,
    });
    record.notes = if point.notes == "None" {
        format!("block_size={}", point.block_size.label())
    } else {
        format!("{}_block_size={}", point.notes, point.block_size.label())
    };
    Ok(record)
}

fn keep_archive(archive: &Path, output_dir: &Path) -> Result<()> {
    let dest = output_dir.join(
        archive
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("archive")),
    );
    std::fs::copy(archive, &dest).map_err(|e| PpcError::io(&dest, e))?;
    println!("#Generated file: {}", dest.display());
    Ok(())
}
