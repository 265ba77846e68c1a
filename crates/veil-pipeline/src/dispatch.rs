//! Per-file transform dispatch.
//!
//! Each candidate file goes through one isolated read → rewrite → encode →
//! write cycle. The write replaces the file atomically, so a failure at any
//! step leaves the original bytes in place.

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use veil_encoder::Encoder;

use crate::error::PipelineError;
use crate::markup::{MalformedMarkup, MarkupDocument};

/// Transform strategy for a file, chosen by name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.html`: body is moved into an encoded script.
    Markup,
    /// `.js`: whole file is encoded.
    Script,
}

impl FileKind {
    /// Classify `path` by its file name, ignoring case.
    ///
    /// Returns `None` for everything the pipeline leaves alone.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".html") {
            Some(Self::Markup)
        } else if name.ends_with(".js") {
            Some(Self::Script)
        } else {
            None
        }
    }
}

/// Result of a transform that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// File was rewritten in place.
    Encoded,
    /// Markup file was left byte-for-byte unchanged.
    Skipped(MalformedMarkup),
}

/// State shared by every directory and file task of one run.
pub(crate) struct TransformContext {
    encoder: Arc<dyn Encoder>,
    /// Bounds concurrent encoder calls.
    permits: Semaphore,
    /// Canonical paths of directories and files already claimed.
    visited: Mutex<HashSet<PathBuf>>,
}

impl TransformContext {
    pub(crate) fn new(encoder: Arc<dyn Encoder>, jobs: usize) -> Self {
        Self {
            encoder,
            permits: Semaphore::new(jobs),
            visited: Mutex::new(HashSet::new()),
        }
    }

    /// Claim a canonical path for this run.
    ///
    /// Returns `false` if it was claimed before, e.g. through a symlink.
    pub(crate) fn claim(&self, canonical: PathBuf) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(canonical)
    }
}

/// Transform one file in place.
pub(crate) async fn transform_file(
    path: PathBuf,
    kind: FileKind,
    ctx: Arc<TransformContext>,
) -> Result<FileOutcome, PipelineError> {
    let result = rewrite(&path, kind, &ctx).await;
    match &result {
        Ok(FileOutcome::Encoded) => tracing::info!(path = %path.display(), "Encoded"),
        Ok(FileOutcome::Skipped(reason)) => {
            tracing::warn!(path = %path.display(), %reason, "Skipped markup file");
        }
        Err(err) => tracing::error!(path = %path.display(), error = %err, "Encoding failed"),
    }
    result
}

async fn rewrite(
    path: &Path,
    kind: FileKind,
    ctx: &TransformContext,
) -> Result<FileOutcome, PipelineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let source = match String::from_utf8_lossy(&bytes) {
        Cow::Borrowed(text) => text.to_owned(),
        Cow::Owned(text) => {
            tracing::warn!(path = %path.display(), "Invalid UTF-8 replaced with U+FFFD");
            text
        }
    };

    let rewritten = match kind {
        FileKind::Script => encode(path, source, ctx).await?,
        FileKind::Markup => {
            let doc = match MarkupDocument::parse(&source) {
                Ok(doc) => doc,
                Err(reason) => return Ok(FileOutcome::Skipped(reason)),
            };
            let encoded = encode(path, doc.body_statement(), ctx).await?;
            doc.assemble(&encoded)
        }
    };

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || replace_file(&target, rewritten.as_bytes()))
        .await
        .map_err(|e| PipelineError::Task {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .map_err(|source| PipelineError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(FileOutcome::Encoded)
}

/// Run the encoder on the blocking pool, at most `permits` at a time.
async fn encode(
    path: &Path,
    script: String,
    ctx: &TransformContext,
) -> Result<String, PipelineError> {
    let _permit = ctx
        .permits
        .acquire()
        .await
        .map_err(|e| PipelineError::Task {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let encoder = Arc::clone(&ctx.encoder);
    tokio::task::spawn_blocking(move || encoder.encode(&script))
        .await
        .map_err(|e| PipelineError::Task {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .map_err(|source| PipelineError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

/// Replace `path` with `contents` via a sibling temp file and rename.
///
/// The original permissions are carried over to the new file.
fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();

    let mut tmp = tempfile::Builder::new()
        .prefix(".veil-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
