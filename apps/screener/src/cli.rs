/// Command-line definitions.
use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};

use crate::screening::profile::PRESETS;

/// Screens résumés against a keyword taxonomy and notifies candidates of their tier.
#[derive(Debug, Parser)]
#[command(name = "screener")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Send every message to this address instead of the one found in the résumé
    #[arg(short, long, global = true, env = "SCREENER_RECIPIENT")]
    pub recipient: Option<String>,

    /// Log messages instead of sending them, even if a mail relay is configured
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the taxonomy and tier rules come from.
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Profile JSON file (taxonomy, tiers, templates)
    #[arg(long, global = true, env = "SCREENER_PROFILE", conflicts_with = "preset")]
    pub profile: Option<PathBuf>,

    /// Built-in profile name
    #[arg(
        long,
        global = true,
        env = "SCREENER_PRESET",
        default_value = "ai-developer",
        value_parser = PossibleValuesParser::new(PRESETS.iter().copied())
    )]
    pub preset: String,

    /// Minimum distinct keywords per category (categorized profiles only)
    #[arg(long, global = true, env = "SCREENER_MIN_HITS")]
    pub min_hits: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Screen every résumé in a folder (or the listed files), one after another
    Batch(BatchArgs),

    /// Screen a single résumé
    Analyze(AnalyzeArgs),

    /// Serve the screening HTTP API
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// A folder of résumés, or individual files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    pub file: PathBuf,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (defaults to $PORT or 8080)
    #[arg(long)]
    pub port: Option<u16>,
}
