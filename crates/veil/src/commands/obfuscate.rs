//! `veil obfuscate` command implementation.

use clap::Args;
use veil_config::Config;

use super::{CommonArgs, EncoderArgs, pipeline_from_config};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the obfuscate command.
#[derive(Args)]
pub(crate) struct ObfuscateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    encoder: EncoderArgs,
}

impl ObfuscateArgs {
    /// Execute the obfuscate command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or any file fails to transform.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config(self.encoder.cli_settings())?;
        obfuscate(&config, &output).await
    }
}

/// Obfuscate the configured output directory and report the result.
pub(crate) async fn obfuscate(config: &Config, output: &Output) -> Result<(), CliError> {
    let dir = &config.output_resolved.dir;
    output.info(&format!("Output: {}", dir.display()));
    let pipeline = pipeline_from_config(config);
    output.info(&format!(
        "Encoder: {} ({} jobs)",
        config.encoder.command,
        pipeline.jobs()
    ));

    let summary = pipeline.run(dir).await?;

    output.summary(dir, &summary);
    Ok(())
}
