//! Terminal reporting for veil commands.

use std::path::Path;

use console::{Style, Term};
use veil_pipeline::RunSummary;

/// Writes progress and results to stderr.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(&Style::new(), msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&Style::new().green(), msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&Style::new().yellow(), msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&Style::new().red().bold(), msg);
    }

    /// Report the counts of a finished obfuscation run over `dir`.
    pub(crate) fn summary(&self, dir: &Path, summary: &RunSummary) {
        if summary.skipped > 0 {
            self.warning(&format!(
                "Skipped {} markup file(s) without a head or body element",
                summary.skipped
            ));
        }
        self.success(&format!(
            "Obfuscated {} file(s) in {}",
            summary.encoded,
            dir.display()
        ));
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }
}
