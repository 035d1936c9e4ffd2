use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a sort run.
#[derive(Debug, Error)]
pub enum SortError {
    /// Source folder does not exist or is not a directory.
    #[error("Source folder not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A cleanup glob could not be compiled.
    #[error("Invalid cleanup pattern: {0}")]
    Pattern(#[from] globset::Error),
}

impl SortError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SortError>;
