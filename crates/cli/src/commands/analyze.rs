//! Analyze command implementation
//!
//! This module implements the `finality analyze` command, which loads a
//! simulation snapshot and prints its finality metrics.

use std::path::Path;

use anyhow::{Context, Result};
use finality_analyzer::{Analyzer, FinalityReport};
use finality_view::{log_view_summary, SimulationView, ViewSnapshot};
use tracing::info;

/// Load a snapshot file and replay it into a view
pub fn load_view(snapshot: &Path) -> Result<SimulationView> {
    info!("Loading snapshot {}", snapshot.display());

    let view = ViewSnapshot::load(snapshot)
        .with_context(|| format!("Failed to load snapshot: {}", snapshot.display()))?
        .into_view()
        .with_context(|| format!("Snapshot is not a valid view: {}", snapshot.display()))?;

    log_view_summary(&view);
    Ok(view)
}

/// Compute the finality report for a view
pub fn build_report(view: &SimulationView) -> Result<FinalityReport> {
    FinalityReport::collect(&Analyzer::new(view)).context("Failed to analyze snapshot")
}

/// Execute the analyze command
pub fn execute_analyze_command(snapshot: &Path) -> Result<()> {
    let view = load_view(snapshot)?;
    let stats = view.stats();

    println!("Snapshot: {}", snapshot.display());
    println!("View:");
    println!("   Messages: {}", stats.total_messages);
    println!("   Tips: {}", stats.tip_count);
    println!("   Senders: {}", stats.sender_count);
    println!("   Finalized: {}", stats.finalized_count);
    if let (Some(earliest), Some(latest)) = (stats.earliest_added, stats.latest_added) {
        println!("   Added between t={} and t={}", earliest, latest);
    }

    println!("{}", build_report(&view)?);

    Ok(())
}
