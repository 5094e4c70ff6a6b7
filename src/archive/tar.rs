//! External tar + compressor plumbing.
//!
//! Archives are tar streams piped through an arbitrary external compressor
//! via `tar -I`. Ownership and permission flags are pinned so the archive
//! bytes depend only on the input files and the permutation.

use crate::error::{ArchiveErrorKind, PpcError, Result};
use std::path::Path;
use std::process::Command;

/// The tar implementation to invoke (GNU tar is `gtar` on macOS).
#[must_use]
pub fn tar_binary() -> &'static str {
    if cfg!(target_os = "macos") {
        "gtar"
    } else {
        "tar"
    }
}

/// An external compressor: the full command string handed to `tar -I`, plus
/// the bare program name used in filenames and reports.
#[derive(Debug, Clone)]
pub struct Compressor {
    spec: String,
    name: String,
}

impl Compressor {
    /// Parse a compressor spec like `zstd` or `zstd -T0 -9`.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let first = spec.split_whitespace().next().unwrap_or(spec);
        let name = Path::new(first)
            .file_name()
            .map_or_else(|| first.to_string(), |f| f.to_string_lossy().into_owned());
        Self {
            spec: spec.to_string(),
            name,
        }
    }

    /// The full command string (program plus flags).
    #[must_use]
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// The bare program name, used in archive filenames and the TECHNIQUE
    /// column.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check the program exists: either the spec's first token is an
    /// executable file (a wrapper script) or the name resolves on PATH.
    pub fn ensure_available(&self) -> Result<()> {
        let first = self.spec.split_whitespace().next().unwrap_or(&self.spec);
        if Path::new(first).is_file() || on_path(first) {
            return Ok(());
        }
        Err(PpcError::archive(
            "compressor lookup",
            ArchiveErrorKind::CompressorMissing(first.to_string()),
        ))
    }
}

fn on_path(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}

fn run_checked(cmd: &mut Command) -> Result<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let output = cmd
        .output()
        .map_err(|e| PpcError::io(Path::new(&program), e))?;
    if output.status.success() {
        return Ok(());
    }
    let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    stderr.truncate(512);
    Err(PpcError::archive(
        "external tool",
        ArchiveErrorKind::ToolFailed {
            program,
            status: output.status.to_string(),
            stderr,
        },
    ))
}

/// Create `archive` from the files listed (one relative path per line) in
/// `list_file`, resolved against `input_dir`, compressing through
/// `compressor`.
pub fn tar_create(
    archive: &Path,
    input_dir: &Path,
    list_file: &Path,
    compressor: &Compressor,
) -> Result<()> {
    run_checked(
        Command::new(tar_binary())
            .arg("-cf")
            .arg(archive)
            .arg("-C")
            .arg(input_dir)
            .arg("-T")
            .arg(list_file)
            .arg("-I")
            .arg(compressor.spec())
            .args(["--owner=0", "--group=0", "--no-same-owner", "--no-same-permissions"]),
    )
}

/// Extract `archive` into `dest_dir` through `compressor`.
pub fn tar_extract(archive: &Path, dest_dir: &Path, compressor: &Compressor) -> Result<()> {
    run_checked(
        Command::new(tar_binary())
            .current_dir(dest_dir)
            .arg("-xf")
            .arg(archive)
            .arg("-I")
            .arg(compressor.spec()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_flagged_specs() {
        let c = Compressor::parse("zstd");
        assert_eq!(c.name(), "zstd");
        assert_eq!(c.spec(), "zstd");

        let c = Compressor::parse("zstd -T0 -19");
        assert_eq!(c.name(), "zstd");
        assert_eq!(c.spec(), "zstd -T0 -19");

        let c = Compressor::parse("/opt/scripts/my_zstd.sh -q");
        assert_eq!(c.name(), "my_zstd.sh");
    }

    #[test]
    fn missing_compressor_is_reported() {
        let c = Compressor::parse("definitely-not-a-real-compressor-9f3a");
        let err = c.ensure_available().unwrap_err();
        assert!(err.to_string().contains("compressor"));
    }
}
