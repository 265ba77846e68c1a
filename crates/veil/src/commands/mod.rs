//! CLI command implementations.

pub(crate) mod obfuscate;
pub(crate) mod rewrite_rules;
pub(crate) mod run;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use veil_config::{CliSettings, Config};
use veil_encoder::CommandEncoder;
use veil_pipeline::Pipeline;

pub(crate) use obfuscate::ObfuscateArgs;
pub(crate) use rewrite_rules::RewriteRulesArgs;
pub(crate) use run::RunArgs;

/// Arguments shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover veil.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Build output directory (overrides config).
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Enable verbose output (log every processed file).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Encoder selection arguments.
#[derive(Args)]
pub(crate) struct EncoderArgs {
    /// Encoder program reading a script on stdin (overrides config).
    #[arg(long, env = "VEIL_ENCODER")]
    encoder: Option<String>,

    /// Maximum concurrent encoder calls (overrides config).
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl CommonArgs {
    /// Load configuration with CLI overrides applied.
    fn load_config(&self, settings: CliSettings) -> Result<Config, veil_config::ConfigError> {
        let settings = CliSettings {
            output_dir: self.dir.clone(),
            ..settings
        };
        Config::load(self.config.as_deref(), Some(&settings))
    }
}

impl EncoderArgs {
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            encoder_command: self.encoder.clone(),
            jobs: self.jobs,
            ..CliSettings::default()
        }
    }
}

/// Build the pipeline described by `config`.
fn pipeline_from_config(config: &Config) -> Pipeline {
    let encoder = CommandEncoder::new(config.encoder.command.clone(), config.encoder.args.clone());
    let pipeline = Pipeline::new(Arc::new(encoder));
    match config.encoder.jobs {
        Some(jobs) => pipeline.with_jobs(jobs),
        None => pipeline,
    }
}
