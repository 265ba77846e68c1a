//! Apache rewrite rules for single-page-application routing.
//!
//! Any request that does not hit an existing file or directory is served
//! the fallback document, so client-side routes survive a page reload.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Name of the rules file written to the build root.
pub const REWRITE_RULES_FILENAME: &str = ".htaccess";

/// Default document unmatched requests fall back to.
pub const DEFAULT_FALLBACK: &str = "index.html";

/// Render the rules file content for `fallback`.
#[must_use]
pub fn rewrite_rules(fallback: &str) -> String {
    let rule = format!("RewriteRule ^ {fallback} [L]");
    [
        "RewriteEngine On",
        "RewriteCond %{REQUEST_FILENAME} !-f",
        "RewriteCond %{REQUEST_FILENAME} !-d",
        rule.as_str(),
    ]
    .join("\n")
}

/// Write the rules file into `root`, replacing any existing one.
///
/// Returns the path of the written file.
pub async fn write_rewrite_rules(root: &Path, fallback: &str) -> Result<PathBuf, PipelineError> {
    if !tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir()) {
        tracing::error!(root = %root.display(), "Rewrite rules not written: output directory not found");
        return Err(PipelineError::MissingRoot(root.to_path_buf()));
    }

    let path = root.join(REWRITE_RULES_FILENAME);
    tokio::fs::write(&path, rewrite_rules(fallback))
        .await
        .map_err(|source| PipelineError::Write {
            path: path.clone(),
            source,
        })?;

    tracing::info!(path = %path.display(), "Rewrite rules written");
    Ok(path)
}
