//! CLI command definitions and handlers

mod analyze;
mod init;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use analyze::AnalyzeArgs;

/// Parse and validate workers count (0-64, 0 = auto)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Signalscope - signal fusion and finder engine
///
/// Consumes scanner facts (JSON) and git history, fuses them into a signal
/// field and reports ranked findings.
#[derive(Parser, Debug)]
#[command(name = "signalscope")]
#[command(
    version,
    about = "Fuse structural, temporal and team signals of a repository into ranked findings",
    after_help = "\
Examples:
  signalscope analyze facts.json                      Analyze with git history from .
  signalscope analyze facts.json --repo ../app        Read history from another checkout
  signalscope analyze facts.json --no-git -f json     Structural signals only, JSON output
  signalscope analyze facts.json --history .signalscope/history.json --record
  signalscope init                                    Write a default signalscope.toml"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the signal pipeline and finders over scanner facts
    Analyze(AnalyzeArgs),

    /// Write a signalscope.toml with the default settings
    Init {
        /// Directory to write the config into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze::run(args),
        Commands::Init { path, force } => init::run(&path, force),
    }
}
