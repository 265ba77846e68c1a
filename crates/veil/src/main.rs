//! veil CLI - Post-build obfuscator for static web builds.
//!
//! Provides commands for:
//! - `run`: Obfuscate the build output and write the rewrite rules file
//! - `obfuscate`: Only obfuscate scripts and markup in the build output
//! - `rewrite-rules`: Only write the `.htaccess` rewrite rules file

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ObfuscateArgs, RewriteRulesArgs, RunArgs};
use output::Output;

/// veil - Post-build obfuscator for static web builds.
#[derive(Parser)]
#[command(name = "veil", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Obfuscate the build output, then write the rewrite rules file.
    Run(RunArgs),
    /// Obfuscate script and markup files in the build output.
    Obfuscate(ObfuscateArgs),
    /// Write the single-page-application rewrite rules file.
    RewriteRules(RewriteRulesArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Run(args) => args.common.verbose,
            Self::Obfuscate(args) => args.common.verbose,
            Self::RewriteRules(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(async {
            match cli.command {
                Commands::Run(args) => args.execute().await,
                Commands::Obfuscate(args) => args.execute().await,
                Commands::RewriteRules(args) => args.execute().await,
            }
        }),
        Err(err) => Err(err.into()),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "veil",
            "run",
            "--dir",
            "build",
            "--encoder",
            "my-encoder",
            "--jobs",
            "3",
            "--no-rewrite-rules",
            "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Run(_)));
        assert!(cli.command.verbose());
    }

    #[test]
    fn test_parse_rewrite_rules() {
        let cli = Cli::try_parse_from(["veil", "rewrite-rules", "-d", "dist"]).unwrap();
        assert!(matches!(cli.command, Commands::RewriteRules(_)));
        assert!(!cli.command.verbose());
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["veil", "serve"]).is_err());
    }
}
