//! `veil run` command implementation.
//!
//! The after-build entry point: obfuscates the output directory, then writes
//! the rewrite rules file.

use clap::Args;
use veil_config::Config;

use super::obfuscate::obfuscate;
use super::rewrite_rules::write_rewrite_rules;
use super::{CommonArgs, EncoderArgs};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the run command.
#[derive(Args)]
pub(crate) struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    encoder: EncoderArgs,

    /// Do not write the rewrite rules file.
    #[arg(long)]
    no_rewrite_rules: bool,
}

impl RunArgs {
    /// Execute the run command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, any file fails to transform,
    /// or the rewrite rules file cannot be written.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let mut settings = self.encoder.cli_settings();
        settings.rewrite_rules_enabled = self.no_rewrite_rules.then_some(false);
        let config = self.common.load_config(settings)?;

        run(&config, &output).await
    }
}

/// Obfuscate the output directory and write the rewrite rules file.
///
/// The rules file is written even if obfuscation fails. An obfuscation error
/// is reported before a rules error.
async fn run(config: &Config, output: &Output) -> Result<(), CliError> {
    let obfuscated = obfuscate(config, output).await;
    if !config.rewrite_rules.enabled {
        return obfuscated;
    }

    let written = write_rewrite_rules(config, output).await;
    obfuscated?;
    written
}
