//! **Permute–Partition–Compress benchmarking for large collections of small
//! files.**
//!
//! `ppc-bench` measures how much a similarity-aware ordering of small files
//! ("blobs") improves generic compression. Given a manifest of blobs it
//! computes a permutation that co-locates similar content, concatenates the
//! blobs into one or more tar archives, compresses each through an external
//! compressor, decompresses again, and reports ratio and throughput as CSV
//! on stdout.
//!
//! The interesting machinery is the permutation engine:
//!
//! - **[`order`]**: the ordering strategies, from trivial (manifest order,
//!   fixed-seed random, length) through sort-based locality-sensitive
//!   hashes (SimHash, TLSH) to graph clusterings, plus the type-aware
//!   two-stage grouper.
//! - **[`fingerprint`]**: per-blob fingerprints — SimHash, TLSH bodies,
//!   MinHash sketches — with size gates and sentinel handling for blobs
//!   that are skipped.
//! - **[`cluster`]**: a weighted quick-union structure and the banded LSH
//!   graph built on it: blobs sharing any band of their sketch end up in
//!   one connected component.
//! - **[`archive`]**: the harness that turns a permutation into archives
//!   (single or fixed-size blocks), runs the external compressor in
//!   parallel, and measures both directions.
//!
//! ## Ordering a dataset
//!
//! ```no_run
//! use ppc_bench::manifest::Dataset;
//! use ppc_bench::order::{order, OrderContext, OrderParams, Strategy};
//! use std::path::Path;
//!
//! fn main() -> ppc_bench::Result<()> {
//!     let dataset = Dataset::from_csv(Path::new("blobs.csv"))?;
//!     let ctx = OrderContext {
//!         dataset: &dataset,
//!         input_dir: Path::new("/data/blobs"),
//!         params: OrderParams::default(),
//!     };
//!     let permutation = order(Strategy::Minhashgraph, &ctx)?;
//!     assert_eq!(permutation.len(), dataset.len());
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // usize/u64/f64 casts are pervasive in size and timing math; all values
    // are bounded in practice
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

pub mod archive;
pub mod cluster;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod hashing;
pub mod manifest;
pub mod oracle;
pub mod order;
pub mod report;
pub mod stats;

// Re-export main types for convenience
pub use archive::{run_point, BenchmarkPoint, Compressor};
pub use cluster::{GraphKind, UnionFind};
pub use config::{BenchConfig, BlockSize, DEFAULT_THREADS};
pub use error::{ErrorContext, PpcError, Result};
pub use fingerprint::Fingerprint;
pub use manifest::{BlobRecord, Dataset};
pub use order::{order, OrderContext, OrderParams, Strategy};
pub use report::BenchmarkRecord;
