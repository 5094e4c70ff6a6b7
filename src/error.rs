//! Unified error types for ppc-bench.
//!
//! One top-level error enum with kind sub-enums per pipeline stage, plus a
//! lightweight context-chaining extension trait so call sites can annotate
//! failures without losing the source chain.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ppc-bench operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PpcError {
    /// Errors while loading a blob manifest
    #[error("Failed to load manifest: {context}")]
    Manifest {
        context: String,
        #[source]
        source: ManifestErrorKind,
    },

    /// Errors in the archive build / measure phase
    #[error("Archive phase failed: {context}")]
    Archive {
        context: String,
        #[source]
        source: ArchiveErrorKind,
    },

    /// IO errors with path context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors (bad flags, missing directories, malformed sizes)
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Specific manifest error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ManifestErrorKind {
    #[error("CSV reader error: {0}")]
    Csv(String),

    #[error("no parsable rows")]
    Empty,
}

/// Specific archive error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ArchiveErrorKind {
    #[error("compressor `{0}` not found (not on PATH and not an executable file)")]
    CompressorMissing(String),

    #[error("`{program}` exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("cannot create working directory: {0}")]
    WorkingDir(String),
}

/// Convenient Result type for ppc-bench operations
pub type Result<T> = std::result::Result<T, PpcError>;

impl PpcError {
    /// Create a manifest error with context
    pub fn manifest(context: impl Into<String>, source: ManifestErrorKind) -> Self {
        Self::Manifest {
            context: context.into(),
            source,
        }
    }

    /// Create an archive error with context
    pub fn archive(context: impl Into<String>, source: ArchiveErrorKind) -> Self {
        Self::Archive {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for PpcError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<csv::Error> for PpcError {
    fn from(err: csv::Error) -> Self {
        Self::manifest(
            "CSV deserialization",
            ManifestErrorKind::Csv(err.to_string()),
        )
    }
}

/// Extension trait for adding context to errors.
///
/// The context string is prepended to the error's existing context, creating
/// a chain that shows the path through the code.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure (only evaluated on the error path).
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<PpcError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

fn add_context_to_error(err: PpcError, new_ctx: &str) -> PpcError {
    match err {
        PpcError::Manifest {
            context: existing,
            source,
        } => PpcError::Manifest {
            context: chain_context(new_ctx, &existing),
            source,
        },
        PpcError::Archive {
            context: existing,
            source,
        } => PpcError::Archive {
            context: chain_context(new_ctx, &existing),
            source,
        },
        PpcError::Io {
            path,
            message,
            source,
        } => PpcError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        PpcError::Config(msg) => PpcError::Config(chain_context(new_ctx, &msg)),
    }
}

/// Chain two context strings together.
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PpcError::manifest("at blobs.csv", ManifestErrorKind::Empty);
        let display = err.to_string();
        assert!(
            display.contains("manifest") || display.contains("blobs.csv"),
            "Error message should mention the manifest: {display}"
        );
    }

    #[test]
    fn test_io_error_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = PpcError::io("/data/blobs/ab/abc123", io_err);
        assert!(err.to_string().contains("/data/blobs/ab/abc123"));
    }

    #[test]
    fn test_context_chaining() {
        let initial: Result<()> = Err(PpcError::archive(
            "inner",
            ArchiveErrorKind::WorkingDir("disk full".into()),
        ));
        match initial.context("outer") {
            Err(PpcError::Archive { context, .. }) => {
                assert!(context.contains("outer"), "missing outer: {context}");
                assert!(context.contains("inner"), "missing inner: {context}");
            }
            _ => panic!("expected Archive error"),
        }
    }

    #[test]
    fn test_with_context_lazy_evaluation() {
        let mut called = false;
        let ok: Result<i32> = Ok(42);
        let _ = ok.with_context(|| {
            called = true;
            "not evaluated"
        });
        assert!(!called, "closure should not run for Ok result");
    }

    #[test]
    fn test_chain_context_helper() {
        assert_eq!(chain_context("new", ""), "new");
        assert_eq!(chain_context("outer", "mid: inner"), "outer: mid: inner");
    }
}
