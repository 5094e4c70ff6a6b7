//! Manifest loading and the blob dataset.
//!
//! A manifest is a CSV with one row per blob. Malformed rows and rows with
//! missing fields are skipped (with a debug log); a manifest that yields no
//! rows at all is an error. Row order defines the canonical blob index.

use crate::error::{ManifestErrorKind, PpcError, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// One blob as described by the manifest. Read-only after load.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobRecord {
    /// Archival identifier (carried through, not interpreted)
    pub swhid: String,
    /// Content-address string; the on-disk basename
    pub file_id: String,
    /// Uncompressed size in bytes
    pub length: u64,
    /// Directory prefix under the input dir
    pub local_path: String,
    /// Bare filename in the originating repository
    pub filename: String,
    /// Full path in the originating repository
    pub filepath: String,
}

impl BlobRecord {
    fn is_complete(&self) -> bool {
        !self.swhid.is_empty()
            && !self.file_id.is_empty()
            && !self.local_path.is_empty()
            && !self.filename.is_empty()
            && !self.filepath.is_empty()
    }
}

/// An ordered collection of blobs; index `i` in `[0, N)` is the canonical
/// identity used by permutations, clusters and blocks.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    records: Vec<BlobRecord>,
}

impl Dataset {
    /// Build a dataset from already-loaded records (used by tests and benches).
    #[must_use]
    pub fn new(name: impl Into<String>, records: Vec<BlobRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    /// Load a manifest CSV from disk.
    ///
    /// The dataset name is the file stem with a trailing `_info` suffix
    /// stripped, matching the naming convention of generated manifests.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| PpcError::io(path, e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());
        let name = name.strip_suffix("_info").unwrap_or(&name).to_string();
        Self::from_reader(name, file)
    }

    /// Load a manifest from any reader. Rows that fail to parse or have
    /// missing fields are skipped.
    pub fn from_reader(name: impl Into<String>, reader: impl Read) -> Result<Self> {
        let name = name.into();
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(false)
            .trim(csv::Trim::None)
            .from_reader(reader);

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in csv_reader.deserialize::<BlobRecord>() {
            match row {
                Ok(rec) if rec.is_complete() => records.push(rec),
                Ok(_) => skipped += 1,
                Err(err) => {
                    skipped += 1;
                    tracing::debug!(%err, "skipping malformed manifest row");
                }
            }
        }
        if skipped > 0 {
            tracing::debug!(dataset = %name, skipped, "dropped incomplete manifest rows");
        }
        if records.is_empty() {
            return Err(PpcError::manifest(
                format!("dataset `{name}`"),
                ManifestErrorKind::Empty,
            ));
        }
        Ok(Self { name, records })
    }

    /// Dataset name, used in reports and archive filenames.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[BlobRecord] {
        &self.records
    }

    /// The record at canonical index `i`. Panics on out-of-range indices,
    /// which would mean a broken permutation.
    #[must_use]
    pub fn record(&self, i: u32) -> &BlobRecord {
        &self.records[i as usize]
    }

    /// The blob's path relative to the input dir: `<local_path>/<file_id>`.
    #[must_use]
    pub fn blob_rel_path(&self, i: u32) -> PathBuf {
        let rec = self.record(i);
        Path::new(&rec.local_path).join(&rec.file_id)
    }

    /// The blob's absolute on-disk location.
    #[must_use]
    pub fn blob_path(&self, input_dir: &Path, i: u32) -> PathBuf {
        input_dir.join(self.blob_rel_path(i))
    }

    /// Sum of all blob sizes in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.length).sum()
    }

    /// Sum of blob sizes over a subset of indices.
    #[must_use]
    pub fn subset_bytes(&self, rows: &[u32]) -> u64 {
        rows.iter().map(|&i| self.record(i).length).sum()
    }

    /// Mean blob size in bytes.
    #[must_use]
    pub fn mean_bytes(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.total_bytes() as f64 / self.records.len() as f64
    }

    /// Median blob size in bytes (average of the two middle values for even
    /// counts).
    #[must_use]
    pub fn median_bytes(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let mut lengths: Vec<u64> = self.records.iter().map(|r| r.length).collect();
        lengths.sort_unstable();
        let mid = lengths.len() / 2;
        if lengths.len() % 2 == 1 {
            lengths[mid] as f64
        } else {
            (lengths[mid - 1] + lengths[mid]) as f64 / 2.0
        }
    }
}
