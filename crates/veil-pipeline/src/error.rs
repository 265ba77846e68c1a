//! Pipeline error types.

use std::io;
use std::path::PathBuf;

use veil_encoder::EncodeError;

/// Fatal pipeline error.
///
/// Every variant carries the path that caused the failure so a failed run
/// identifies the offending file or directory.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Build root does not exist or is not a directory.
    #[error("Output directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    /// Directory listing failed.
    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File could not be read as UTF-8 text.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Rewritten content could not be written back.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// External encoder failed.
    #[error("Failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },

    /// A worker task panicked or was torn down.
    #[error("Task for {} did not complete: {message}", .path.display())]
    Task { path: PathBuf, message: String },
}

impl PipelineError {
    /// Path of the file or directory that caused the failure.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::MissingRoot(path)
            | Self::ReadDir { path, .. }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Encode { path, .. }
            | Self::Task { path, .. } => path,
        }
    }
}
