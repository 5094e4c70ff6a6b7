//! Benchmark run configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default worker pool size, matching the historical benchmark setup.
pub const DEFAULT_THREADS: usize = 16;

/// A block-size target parsed from the command line.
///
/// `0` means a single archive; otherwise an integer followed by a power-of-1024
/// unit (`KiB`, `MiB`, `GiB`). The original textual form is kept because it is
/// embedded in archive filenames and in the NOTES column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSize {
    bytes: u64,
    label: String,
}

impl BlockSize {
    /// Single-archive mode.
    #[must_use]
    pub fn single() -> Self {
        Self {
            bytes: 0,
            label: "0".to_string(),
        }
    }

    /// Target size in bytes; 0 in single-archive mode.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// True when the whole permutation goes into one archive.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.bytes == 0
    }

    /// The textual form as given on the command line (`0`, `512KiB`, ...).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Clap-compatible parser.
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        s.parse()
    }
}

impl FromStr for BlockSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "0" {
            return Ok(Self::single());
        }
        let err = || {
            format!("block size must be 0 or an integer followed by KiB, MiB or GiB, got `{s}`")
        };
        if s.len() < 4 {
            return Err(err());
        }
        let (num, unit) = s.split_at(s.len() - 3);
        let multiplier: u64 = match unit {
            "KiB" => 1024,
            "MiB" => 1024 * 1024,
            "GiB" => 1024 * 1024 * 1024,
            _ => return Err(err()),
        };
        let count: u64 = num.parse().map_err(|_| err())?;
        if count == 0 {
            return Err(err());
        }
        Ok(Self {
            bytes: count * multiplier,
            label: s.to_string(),
        })
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Resolved settings for one benchmark invocation.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Directory holding the uncompressed blobs (`<local_path>/<file_id>` layout)
    pub input_dir: PathBuf,
    /// Directory for working directories and kept archives
    pub output_dir: PathBuf,
    /// Copy archives (and the sidecar map in block mode) out before cleanup
    pub keep_archives: bool,
    /// Worker pool size for fingerprinting, compression and decompression
    pub threads: usize,
    /// Verbose logging
    pub verbose: bool,
}
