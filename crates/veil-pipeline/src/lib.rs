//! Post-build obfuscation pipeline for bundler output directories.
//!
//! After a bundler has written its output, [`Pipeline::run`] walks the build
//! root and rewrites every script and markup file in place:
//!
//! - `*.js` files are passed through the [`Encoder`] as a whole
//! - `*.html` files keep their head element and body opening tag; the body
//!   content moves into an encoded script that restores it at load time
//! - everything else is left untouched
//!
//! Markup without a recognizable head or body is skipped with a warning. Any
//! other failure (read, encode, write, directory listing) fails the whole
//! run and names the offending path. The run is not idempotent: a second
//! pass encodes the already encoded output again.
//!
//! [`write_rewrite_rules`] writes the `.htaccess` file that routes unknown
//! paths to the entry document.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use veil_encoder::CommandEncoder;
//! use veil_pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(Arc::new(CommandEncoder::new("jscrewit", Vec::new())));
//! let summary = pipeline.run(Path::new("dist")).await?;
//! println!("{} encoded, {} skipped", summary.encoded, summary.skipped);
//! ```

mod dispatch;
mod error;
mod markup;
mod rewrite_rules;
mod walker;

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use veil_encoder::Encoder;

pub use dispatch::{FileKind, FileOutcome};
pub use error::PipelineError;
pub use markup::{MalformedMarkup, MarkupDocument};
pub use rewrite_rules::{
    DEFAULT_FALLBACK, REWRITE_RULES_FILENAME, rewrite_rules, write_rewrite_rules,
};
pub use walker::RunSummary;

use dispatch::TransformContext;

/// Obfuscates a build output directory with a given encoder.
pub struct Pipeline {
    encoder: Arc<dyn Encoder>,
    jobs: usize,
}

impl Pipeline {
    /// Create a pipeline using `encoder`, with one encoder job per CPU.
    #[must_use]
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self {
            encoder,
            jobs: default_jobs(),
        }
    }

    /// Limit concurrent encoder calls. Zero is treated as one.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Maximum number of concurrent encoder calls.
    #[must_use]
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Transform every script and markup file under `root`.
    ///
    /// Performs no file I/O if `root` is not an existing directory.
    pub async fn run(&self, root: &Path) -> Result<RunSummary, PipelineError> {
        if !tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir()) {
            tracing::error!(root = %root.display(), "Output directory not found");
            return Err(PipelineError::MissingRoot(root.to_path_buf()));
        }

        tracing::info!(
            root = %root.display(),
            encoder = self.encoder.name(),
            jobs = self.jobs,
            "Obfuscating build output"
        );

        let ctx = Arc::new(TransformContext::new(Arc::clone(&self.encoder), self.jobs));
        walker::walk_dir(root.to_path_buf(), ctx).await
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(4, NonZeroUsize::get)
}
