//! `veil rewrite-rules` command implementation.

use clap::Args;
use veil_config::{CliSettings, Config};

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the rewrite-rules command.
#[derive(Args)]
pub(crate) struct RewriteRulesArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl RewriteRulesArgs {
    /// Execute the rewrite-rules command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the file cannot be written.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config(CliSettings::default())?;
        write_rewrite_rules(&config, &output).await
    }
}

/// Write the rewrite rules file into the configured output directory.
pub(crate) async fn write_rewrite_rules(config: &Config, output: &Output) -> Result<(), CliError> {
    let path = veil_pipeline::write_rewrite_rules(
        &config.output_resolved.dir,
        &config.rewrite_rules.fallback,
    )
    .await?;
    output.success(&format!("Rewrite rules written to {}", path.display()));
    Ok(())
}
