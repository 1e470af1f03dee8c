use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;
mod config;

use commands::{execute_analyze_command, execute_classify_command};
use config::{AnalyzeConfig, CategoryFilter};

#[derive(Parser)]
#[command(name = "finality")]
#[command(about = "Finality analysis for Casper-style DAG simulations")]
#[command(version)]
pub struct Cli {
    /// Tracing filter (e.g. info, debug, finality_analyzer=debug)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print view statistics and finality metrics for a snapshot
    Analyze(AnalyzeArgs),
    /// List every message with its safety category
    Classify(ClassifyArgs),
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the snapshot JSON file
    pub snapshot: PathBuf,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Path to the snapshot JSON file
    pub snapshot: PathBuf,
    /// Only list messages of this category
    #[arg(short, long, value_enum)]
    pub category: Option<CategoryFilter>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => AnalyzeConfig::load(path)?,
        None => AnalyzeConfig::default(),
    };
    let category = match &cli.command {
        Commands::Classify(args) => args.category,
        Commands::Analyze(_) => None,
    };
    let config = base.with_overrides(cli.log_level, category);
    config.init_tracing()?;

    match cli.command {
        Commands::Analyze(args) => execute_analyze_command(&args.snapshot),
        Commands::Classify(args) => execute_classify_command(&args.snapshot, config.category),
    }
}
