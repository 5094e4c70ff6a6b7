//! The benchmark result stream.
//!
//! Results go to stdout as one CSV header plus one record per benchmark
//! point. Everything that is not a record is prefixed with `#`, so the
//! stream stays machine-readable even when a tuple fails mid-run.

use chrono::Local;
use std::io::Write;

const GIB: f64 = (1u64 << 30) as f64;
const MIB: f64 = (1u64 << 20) as f64;
const KIB: f64 = (1u64 << 10) as f64;

/// Build-time commit hash for the COMMIT_HASH column; falls back to the
/// crate version when the build did not set `PPC_COMMIT`.
#[must_use]
pub fn commit_hash() -> &'static str {
    option_env!("PPC_COMMIT").unwrap_or(env!("CARGO_PKG_VERSION"))
}

fn flush_line(line: &str) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

/// Opening banner framing one benchmark run.
pub fn print_start_banner(input_dir: &std::path::Path, output_dir: &std::path::Path) {
    flush_line(&format!(
        "# Start: {}. Taking files from {}. Saving archives to {}. PID {}.",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        input_dir.display(),
        output_dir.display(),
        std::process::id()
    ));
}

/// Closing banner.
pub fn print_end_banner() {
    flush_line(&format!(
        "# End: {}.",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
}

/// The CSV header. Block mode adds the per-blob decompression columns and
/// reports the extrapolated full-decompression speed.
pub fn print_header(block_mode: bool) {
    if block_mode {
        flush_line(
            "DATASET,NUM_BLOBS,TOTAL_SIZE(GiB),AVG_BLOB_SIZE(KiB),MEDIAN_BLOB_SIZE(KiB),\
             TECHNIQUE,COMPRESSION_RATIO(%),ORDERING_TIME(s),COMPRESSION_TIME(s),\
             COMPRESSION_SPEED(MiB/s),FULL_DECOMPRESSION_SPEED(MiB/s),\
             TIME_BLOB_DECOMPRESSION(ms),THROUGHPUT(blobs/s),COMMIT_HASH,NOTES",
        );
    } else {
        flush_line(
            "DATASET,NUM_BLOBS,TOTAL_SIZE(GiB),AVG_BLOB_SIZE(KiB),MEDIAN_BLOB_SIZE(KiB),\
             TECHNIQUE,COMPRESSION_RATIO(%),ORDERING_TIME(s),COMPRESSION_TIME(s),\
             COMPRESSION_SPEED(MiB/s),DECOMPRESSION_SPEED(MiB/s),COMMIT_HASH,NOTES",
        );
    }
}

/// `# Error` diagnostic for a failed benchmark point.
pub fn print_error_line(technique: &str, compressor: &str, err: &crate::error::PpcError) {
    flush_line(&format!("# Error: {technique}+{compressor}: {err}"));
}

/// Extra columns present only in block mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMetrics {
    /// Mean wall time to decompress one block, in milliseconds
    pub per_block_ms: f64,
    /// Blobs per second at the extrapolated full-decompression rate
    pub throughput: f64,
}

/// One benchmark point, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub dataset: String,
    pub num_blobs: usize,
    pub total_bytes: u64,
    pub mean_bytes: f64,
    pub median_bytes: f64,
    /// `<technique>+<compressor>`
    pub technique: String,
    pub ratio_percent: f64,
    pub ordering_time: f64,
    pub compression_time: f64,
    pub compression_speed: f64,
    pub decompression_speed: f64,
    pub block: Option<BlockMetrics>,
    pub notes: String,
}

impl BenchmarkRecord {
    /// Derive the speed columns from sizes and wall times. Ordering time is
    /// charged to compression speed: the permutation is part of the encoding
    /// pipeline, so downstream consumers pay for it.
    #[must_use]
    pub fn speeds(
        total_bytes: u64,
        ordering_time: f64,
        compression_time: f64,
        decompression_time: f64,
    ) -> (f64, f64) {
        let total_mib = total_bytes as f64 / MIB;
        (
            total_mib / (compression_time + ordering_time),
            total_mib / decompression_time,
        )
    }

    /// Print the record as one CSV line.
    pub fn emit(&self) {
        let prefix = format!(
            "{},{},{:.2},{:.2},{:.2},{},{:.2},{:.2},{:.2},{:.2},{:.2}",
            self.dataset,
            self.num_blobs,
            self.total_bytes as f64 / GIB,
            self.mean_bytes / KIB,
            self.median_bytes / KIB,
            self.technique,
            self.ratio_percent,
            self.ordering_time,
            self.compression_time,
            self.compression_speed,
            self.decompression_speed,
        );
        let line = match &self.block {
            Some(block) => format!(
                "{prefix},{:.2},{:.2},{},{}",
                block.per_block_ms,
                block.throughput,
                commit_hash(),
                self.notes
            ),
            None => format!("{prefix},{},{}", commit_hash(), self.notes),
        };
        flush_line(&line);
    }
}

/// `-s` mode: dataset shape only, no benchmark.
pub fn print_dataset_stats(dataset: &crate::manifest::Dataset) {
    flush_line(
        "DATASET,NUM_BLOBS,TOTAL_SIZE(GiB),AVG_BLOB_SIZE(KiB),MEDIAN_BLOB_SIZE(KiB),COMMIT_HASH,NOTES",
    );
    flush_line(&format!(
        "{},{},{:.2},{:.2},{:.2},{},just_stats",
        dataset.name(),
        dataset.len(),
        dataset.total_bytes() as f64 / GIB,
        dataset.mean_bytes() / KIB,
        dataset.median_bytes() / KIB,
        commit_hash(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speeds_charge_ordering_to_compression() {
        let (comp, decomp) = BenchmarkRecord::speeds(100 * (1 << 20), 2.0, 3.0, 4.0);
        assert!((comp - 20.0).abs() < 1e-9);
        assert!((decomp - 25.0).abs() < 1e-9);
    }

    #[test]
    fn commit_hash_is_nonempty() {
        assert!(!commit_hash().is_empty());
    }
}
