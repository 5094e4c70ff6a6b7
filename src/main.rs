//! ppc-bench: Permute-Partition-Compress benchmark harness
//!
//! Takes manifests of blobs, permutes them with one or more techniques,
//! concatenates them (optionally split into blocks), compresses each block
//! with one or more external compressors, decompresses again and reports
//! ratio and throughput as CSV on stdout.

use anyhow::Result;
use clap::Parser;
use ppc_bench::{
    archive::Compressor,
    config::{BenchConfig, BlockSize, DEFAULT_THREADS},
    manifest::Dataset,
    oracle::{ContentSniffer, ExtensionLangOracle},
    order::{order, OrderContext, OrderParams, Strategy, TwoStageOracle},
    report, stats, BenchmarkPoint,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ppc-bench")]
#[command(version)]
#[command(about = "Permute-Partition-Compress benchmark on large file collections")]
#[command(long_about = "\
Permute-Partition-Compress paradigm on large file collections.

Takes as input a list of files (csv-file arguments), permutes them
according to one or more techniques (-p), concatenates them, optionally
splits the concatenation into blocks (-b), and compresses each block
using one or more compressors (-c).

The input files must all live under one directory (-i). Temporary files
and compressed archives go to a user-provided directory (-o).

Finally the archives are decompressed; compression ratio plus compression
and decompression speed are reported on stdout as CSV.")]
#[command(after_help = "EXIT CODES:
    0  Success
    1  Fatal error (missing directories, bad arguments, unrecoverable failure)

EXAMPLES:
    # Single zstd archive in manifest order
    ppc-bench blobs.csv -p list -c zstd -i /data/blobs -o /tmp/ppc

    # Compare orderings at two block sizes
    ppc-bench blobs.csv -p filename -p minhashgraph -b 512KiB -b 4MiB \\
        -c zstd -i /data/blobs -o /tmp/ppc")]
struct Cli {
    /// Manifest CSV files listing the blobs to compress
    #[arg(value_name = "csv-file", required = true)]
    manifests: Vec<PathBuf>,

    /// Compressors to apply to each block (program name or command with flags)
    #[arg(short, long = "compressor", default_value = "zstd")]
    compressor: Vec<String>,

    /// Permutation strategies to benchmark
    #[arg(short, long = "permuter", value_enum, default_value = "filename")]
    permuter: Vec<Strategy>,

    /// Block size: 0 for a single archive, or an integer followed by
    /// KiB, MiB or GiB (e.g. 512KiB)
    #[arg(short, long = "block-size", default_value = "0", value_parser = BlockSize::parse)]
    block_size: Vec<BlockSize>,

    /// Directory where the uncompressed blobs are stored
    #[arg(short, long = "input-dir")]
    input_dir: PathBuf,

    /// Directory for temporary files and compressed archives
    #[arg(short, long = "output-dir")]
    output_dir: PathBuf,

    /// Keep archives (and the blob-to-archive map in block mode) after the
    /// benchmark instead of deleting them with the working directory
    #[arg(short, long = "keep-tar")]
    keep_tar: bool,

    /// Just print stats of the dataset, no benchmark
    #[arg(short, long)]
    stats: bool,

    /// Print the distribution of blob type labels, no benchmark
    #[arg(long = "type-stats")]
    type_stats: bool,

    /// Worker threads for fingerprinting and block (de)compression
    #[arg(short = 'T', long = "num-thread", default_value_t = DEFAULT_THREADS, env = "THREADS")]
    num_thread: usize,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn fatal(message: &str) -> ! {
    eprintln!("Fatal: {message}");
    std::process::exit(1);
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    if !cli.input_dir.is_dir() {
        fatal(&format!(
            "missing input directory: {}",
            cli.input_dir.display()
        ));
    }
    if !cli.output_dir.is_dir() {
        fatal(&format!(
            "missing output directory: {}",
            cli.output_dir.display()
        ));
    }

    // One fixed-size pool for every parallel phase
    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.num_thread)
        .build_global()
    {
        tracing::debug!(%err, "global thread pool already initialised");
    }

    let config = BenchConfig {
        input_dir: cli.input_dir.clone(),
        output_dir: cli.output_dir.clone(),
        keep_archives: cli.keep_tar,
        threads: cli.num_thread,
        verbose: cli.verbose,
    };

    let permuters: Vec<Strategy> = if cli.permuter.contains(&Strategy::All) {
        Strategy::all_concrete()
    } else {
        cli.permuter.clone()
    };

    let compressors: Vec<Compressor> = cli.compressor.iter().map(|s| Compressor::parse(s)).collect();
    for compressor in &compressors {
        if let Err(err) = compressor.ensure_available() {
            fatal(&err.to_string());
        }
    }

    report::print_start_banner(&config.input_dir, &config.output_dir);

    let block_mode = cli.block_size.iter().any(|b| !b.is_single());

    for manifest in &cli.manifests {
        let dataset = match Dataset::from_csv(manifest) {
            Ok(dataset) => dataset,
            Err(err) => fatal(&format!("{}: {err}", manifest.display())),
        };
        tracing::debug!(
            dataset = dataset.name(),
            blobs = dataset.len(),
            bytes = dataset.total_bytes(),
            "loaded manifest"
        );

        if cli.stats {
            report::print_dataset_stats(&dataset);
            continue;
        }

        let ctx = OrderContext {
            dataset: &dataset,
            input_dir: &config.input_dir,
            params: OrderParams::default(),
        };

        if cli.type_stats {
            let sniffer = ContentSniffer;
            let lang = ExtensionLangOracle;
            let two_stage = TwoStageOracle::new(&sniffer, "text", &lang);
            stats::print_distribution(
                &stats::extension_distribution(&dataset),
                "stats_from_filenames",
            );
            stats::print_distribution(
                &stats::label_distribution(&ctx, &sniffer),
                "stats_from_content",
            );
            stats::print_distribution(
                &stats::label_distribution(&ctx, &two_stage),
                "stats_from_content_and_language",
            );
            continue;
        }

        report::print_header(block_mode);

        for compressor in &compressors {
            for &strategy in &permuters {
                let started = Instant::now();
                let permutation = match order(strategy, &ctx) {
                    Ok(permutation) => permutation,
                    Err(err) => {
                        report::print_error_line(
                            strategy.technique_name(),
                            compressor.name(),
                            &err,
                        );
                        continue;
                    }
                };
                let ordering_time = started.elapsed().as_secs_f64();

                for block_size in &cli.block_size {
                    let point = BenchmarkPoint {
                        dataset: &dataset,
                        permutation: &permutation,
                        technique: strategy.technique_name(),
                        notes: strategy.notes(),
                        ordering_time,
                        compressor,
                        block_size,
                        config: &config,
                    };
                    match ppc_bench::run_point(&point) {
                        Ok(record) => record.emit(),
                        Err(err) => report::print_error_line(
                            strategy.technique_name(),
                            compressor.name(),
                            &err,
                        ),
                    }
                }
            }
        }
    }

    report::print_end_banner();
    Ok(())
}
