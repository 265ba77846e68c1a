//! Encoder trait and error type.

use std::process::ExitStatus;

/// Error returned by an [`Encoder`].
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The external encoder program could not be started.
    #[error("failed to start encoder `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// I/O error while talking to the encoder.
    #[error("encoder I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The encoder exited unsuccessfully.
    #[error("encoder exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    /// The encoder produced output that is not usable as script text.
    #[error("encoder produced invalid output: {0}")]
    InvalidOutput(String),
    /// The encoder refused the input.
    #[error("encoder rejected input: {0}")]
    Rejected(String),
}

/// Turns script text into an obfuscated program with identical runtime behavior.
///
/// Implementations must be pure: the same input always yields an equivalent
/// program, and no state is shared between calls. Encoding is CPU-bound, so
/// callers on an async runtime should run it on a blocking thread.
pub trait Encoder: Send + Sync {
    /// Short identifier used in log output.
    fn name(&self) -> &str;

    /// Encode `script` into its obfuscated equivalent.
    fn encode(&self, script: &str) -> Result<String, EncodeError>;
}
