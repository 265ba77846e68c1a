//! Recursive fork-join directory traversal.
//!
//! Every directory level lists its entries, then spawns one task per
//! subdirectory and per candidate file and waits for all of them. The first
//! failure aborts the remaining tasks of that level (and, through dropped
//! join sets, everything beneath them) and is returned to the parent.
//!
//! Symlinks are followed, but every directory and file is claimed by its
//! canonical path first, so aliases and link cycles are processed once.

use std::collections::HashMap;
use std::fs::Metadata;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};

use crate::dispatch::{FileKind, FileOutcome, TransformContext, transform_file};
use crate::error::PipelineError;

/// Counts for a successfully processed subtree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Files rewritten in place.
    pub encoded: usize,
    /// Markup files left untouched because head or body could not be found.
    pub skipped: usize,
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.encoded += other.encoded;
        self.skipped += other.skipped;
    }
}

impl From<FileOutcome> for RunSummary {
    fn from(outcome: FileOutcome) -> Self {
        match outcome {
            FileOutcome::Encoded => Self {
                encoded: 1,
                skipped: 0,
            },
            FileOutcome::Skipped(_) => Self {
                encoded: 0,
                skipped: 1,
            },
        }
    }
}

type WalkResult = Result<RunSummary, PipelineError>;
type WalkFuture = Pin<Box<dyn Future<Output = WalkResult> + Send>>;

/// Transform every candidate file under `dir`.
pub(crate) fn walk_dir(dir: PathBuf, ctx: Arc<TransformContext>) -> WalkFuture {
    Box::pin(async move {
        let result = walk_level(&dir, &ctx).await;
        if let Err(err) = &result {
            tracing::error!(dir = %dir.display(), error = %err, "Directory failed");
        }
        result
    })
}

async fn walk_level(dir: &Path, ctx: &Arc<TransformContext>) -> WalkResult {
    let read_dir_error = |source| PipelineError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let canonical_dir = tokio::fs::canonicalize(dir).await.map_err(read_dir_error)?;
    if !ctx.claim(canonical_dir.clone()) {
        tracing::debug!(dir = %dir.display(), "Directory already visited");
        return Ok(RunSummary::default());
    }

    // List the whole level before spawning: transforms create temp files here.
    let mut listing = tokio::fs::read_dir(dir).await.map_err(read_dir_error)?;
    let mut paths = Vec::new();
    while let Some(entry) = listing.next_entry().await.map_err(read_dir_error)? {
        paths.push(entry.path());
    }

    let mut tasks = WalkTasks::new(dir);
    for path in paths {
        let Some(entry) = Entry::stat(&path).await? else {
            continue;
        };

        if entry.metadata.is_dir() {
            tasks.spawn(path.clone(), walk_dir(path, Arc::clone(ctx)));
            continue;
        }
        let Some(kind) = FileKind::from_path(&path) else {
            continue;
        };

        // A linked file is rewritten at its target so the link survives.
        let target = if entry.is_symlink {
            tokio::fs::canonicalize(&path)
                .await
                .map_err(|source| PipelineError::Read {
                    path: path.clone(),
                    source,
                })?
        } else {
            path.clone()
        };
        let key = match path.file_name() {
            Some(name) if !entry.is_symlink => canonical_dir.join(name),
            _ => target.clone(),
        };
        if !ctx.claim(key) {
            tracing::debug!(path = %path.display(), "File already claimed");
            continue;
        }

        let ctx = Arc::clone(ctx);
        tasks.spawn(path, async move {
            transform_file(target, kind, ctx)
                .await
                .map(RunSummary::from)
        });
    }

    tasks.join_all().await
}

/// A listed directory entry, with symlinks resolved.
struct Entry {
    metadata: Metadata,
    is_symlink: bool,
}

impl Entry {
    /// Stat `path`, following symlinks.
    ///
    /// Returns `None` if the entry vanished after listing, which happens to
    /// temp files of a transform writing into the same directory. A dangling
    /// symlink is an error.
    async fn stat(path: &Path) -> Result<Option<Self>, PipelineError> {
        let stat_error = |source| PipelineError::ReadDir {
            path: path.to_path_buf(),
            source,
        };

        let link = match tokio::fs::symlink_metadata(path).await {
            Ok(link) => link,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(stat_error(e)),
        };
        if !link.file_type().is_symlink() {
            return Ok(Some(Self {
                metadata: link,
                is_symlink: false,
            }));
        }

        let metadata = tokio::fs::metadata(path).await.map_err(stat_error)?;
        Ok(Some(Self {
            metadata,
            is_symlink: true,
        }))
    }
}

/// Tasks of one directory level, each tagged with the entry it handles.
struct WalkTasks {
    dir: PathBuf,
    set: JoinSet<WalkResult>,
    entries: HashMap<Id, PathBuf>,
}

impl WalkTasks {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            set: JoinSet::new(),
            entries: HashMap::new(),
        }
    }

    fn spawn<F>(&mut self, path: PathBuf, task: F)
    where
        F: Future<Output = WalkResult> + Send + 'static,
    {
        let handle = self.set.spawn(task);
        self.entries.insert(handle.id(), path);
    }

    /// Wait for every task; on the first error abort the rest and return it.
    async fn join_all(mut self) -> WalkResult {
        let mut summary = RunSummary::default();
        while let Some(joined) = self.set.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(PipelineError::Task {
                    path: self.entries.remove(&e.id()).unwrap_or_else(|| self.dir.clone()),
                    message: e.to_string(),
                })
            });
            match result {
                Ok(sub) => summary += sub,
                Err(err) => {
                    self.set.abort_all();
                    return Err(err);
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use veil_encoder::MockEncoder;

    use super::*;

    fn context(encoder: MockEncoder) -> Arc<TransformContext> {
        Arc::new(TransformContext::new(Arc::new(encoder), 4))
    }

    async fn crash() -> WalkResult {
        panic!("encoder crashed")
    }

    #[test]
    fn test_summary_from_outcome() {
        assert_eq!(
            RunSummary::from(FileOutcome::Encoded),
            RunSummary {
                encoded: 1,
                skipped: 0
            }
        );
        let mut total = RunSummary::default();
        total += RunSummary::from(FileOutcome::Encoded);
        total += RunSummary::from(FileOutcome::Skipped(
            crate::markup::MalformedMarkup::MissingHead,
        ));
        assert_eq!(
            total,
            RunSummary {
                encoded: 1,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn test_walk_empty_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let summary = walk_dir(temp_dir.path().to_path_buf(), context(MockEncoder::new()))
            .await
            .unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_walk_recurses_into_nested_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let deep = temp_dir.path().join("static/js/chunks/vendor");
        fs::create_dir_all(&deep).unwrap();
        fs::write(temp_dir.path().join("a.js"), "1").unwrap();
        fs::write(temp_dir.path().join("static/js/b.js"), "2").unwrap();
        fs::write(deep.join("c.JS"), "3").unwrap();

        let summary = walk_dir(temp_dir.path().to_path_buf(), context(MockEncoder::new()))
            .await
            .unwrap();

        assert_eq!(summary.encoded, 3);
        let decoded = MockEncoder::decode(&fs::read_to_string(deep.join("c.JS")).unwrap());
        assert_eq!(decoded.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_walk_leaves_other_files_alone() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("style.css"), "body{}").unwrap();
        fs::write(temp_dir.path().join("app.js.map"), "{}").unwrap();
        fs::write(temp_dir.path().join("logo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();

        let summary = walk_dir(temp_dir.path().to_path_buf(), context(MockEncoder::new()))
            .await
            .unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("style.css")).unwrap(),
            "body{}"
        );
        assert_eq!(
            fs::read(temp_dir.path().join("logo.png")).unwrap(),
            vec![0x89, 0x50, 0x4e, 0x47]
        );
    }

    #[tokio::test]
    async fn test_walk_directory_with_script_suffix_is_descended() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("lib.js");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("inner.js"), "x").unwrap();

        let summary = walk_dir(temp_dir.path().to_path_buf(), context(MockEncoder::new()))
            .await
            .unwrap();

        assert_eq!(summary.encoded, 1);
    }

    #[tokio::test]
    async fn test_walk_failure_in_subtree_fails_whole_walk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("nested/deeper");
        fs::create_dir_all(&nested).unwrap();
        for i in 0..10 {
            fs::write(temp_dir.path().join(format!("ok{i}.js")), "fine").unwrap();
        }
        fs::write(nested.join("bad.js"), "boom").unwrap();

        let err = walk_dir(
            temp_dir.path().to_path_buf(),
            context(MockEncoder::new().failing_on("boom")),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(err, PipelineError::Encode { .. }),
            "Expected PipelineError::Encode, got {err:?}"
        );
        assert_eq!(err.path(), nested.join("bad.js"));
        assert_eq!(fs::read_to_string(nested.join("bad.js")).unwrap(), "boom");
    }

    #[tokio::test]
    async fn test_walk_missing_dir_is_read_dir_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing");
        let err = walk_dir(missing.clone(), context(MockEncoder::new()))
            .await
            .unwrap_err();
        assert!(
            matches!(err, PipelineError::ReadDir { ref path, .. } if *path == missing),
            "Expected PipelineError::ReadDir, got {err:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_dangling_symlink_is_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("nowhere.js"),
            temp_dir.path().join("link.js"),
        )
        .unwrap();

        let err = walk_dir(temp_dir.path().to_path_buf(), context(MockEncoder::new()))
            .await
            .unwrap_err();
        assert_eq!(err.path(), temp_dir.path().join("link.js"));
    }

    #[tokio::test]
    async fn test_panicking_task_names_its_entry() {
        let mut tasks = WalkTasks::new(Path::new("dist"));
        tasks.spawn(PathBuf::from("dist/ok.js"), async {
            Ok(RunSummary::default())
        });
        tasks.spawn(PathBuf::from("dist/bad.js"), crash());

        let err = tasks.join_all().await.unwrap_err();

        assert!(
            matches!(err, PipelineError::Task { .. }),
            "Expected PipelineError::Task, got {err:?}"
        );
        assert_eq!(err.path(), Path::new("dist/bad.js"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_linked_directory_is_processed_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let v2 = temp_dir.path().join("v2");
        fs::create_dir(&v2).unwrap();
        for i in 0..8 {
            fs::write(v2.join(format!("chunk{i}.js")), format!("chunk {i}")).unwrap();
        }
        std::os::unix::fs::symlink(&v2, temp_dir.path().join("latest")).unwrap();

        let summary = walk_dir(temp_dir.path().to_path_buf(), context(MockEncoder::new()))
            .await
            .unwrap();

        assert_eq!(summary.encoded, 8);
        for i in 0..8 {
            let written = fs::read_to_string(v2.join(format!("chunk{i}.js"))).unwrap();
            assert_eq!(
                MockEncoder::decode(&written).as_deref(),
                Some(format!("chunk {i}").as_str())
            );
        }
        assert!(fs::symlink_metadata(temp_dir.path().join("latest"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_symlink_cycle_terminates() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("app.js"), "main()").unwrap();
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("loop")).unwrap();

        let summary = walk_dir(temp_dir.path().to_path_buf(), context(MockEncoder::new()))
            .await
            .unwrap();

        assert_eq!(summary.encoded, 1);
        let written = fs::read_to_string(temp_dir.path().join("app.js")).unwrap();
        assert_eq!(MockEncoder::decode(&written).as_deref(), Some("main()"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_linked_file_rewrites_target_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let app = temp_dir.path().join("app.js");
        let alias = temp_dir.path().join("alias.js");
        fs::write(&app, "main()").unwrap();
        std::os::unix::fs::symlink(&app, &alias).unwrap();

        let summary = walk_dir(temp_dir.path().to_path_buf(), context(MockEncoder::new()))
            .await
            .unwrap();

        assert_eq!(summary.encoded, 1);
        assert!(fs::symlink_metadata(&alias).unwrap().file_type().is_symlink());
        let written = fs::read_to_string(&alias).unwrap();
        assert_eq!(MockEncoder::decode(&written).as_deref(), Some("main()"));
    }
}
