//! Classify command implementation
//!
//! Lists every message of a snapshot with its height and safety category.

use std::path::Path;

use anyhow::{Context, Result};
use finality_analyzer::Analyzer;
use finality_view::{GlobalView, SimulationView};

use crate::commands::analyze::load_view;
use crate::config::CategoryFilter;

/// One line per message, lowest height first
pub fn classification_lines(
    view: &SimulationView,
    filter: Option<CategoryFilter>,
) -> Result<Vec<String>> {
    let categories = Analyzer::new(view)
        .classify()
        .context("Failed to classify messages")?;

    let mut rows: Vec<_> = categories
        .into_iter()
        .filter(|(_, category)| filter.map_or(true, |f| f.matches(*category)))
        .filter_map(|(id, category)| view.message(&id).map(|m| (m.height, id, category)))
        .collect();
    rows.sort();

    Ok(rows
        .into_iter()
        .map(|(height, id, category)| format!("{}  height {:>4}  {}", id.short(), height, category))
        .collect())
}

/// Execute the classify command
pub fn execute_classify_command(snapshot: &Path, filter: Option<CategoryFilter>) -> Result<()> {
    let view = load_view(snapshot)?;

    let lines = classification_lines(&view, filter)?;
    for line in &lines {
        println!("{}", line);
    }
    println!("{} messages listed", lines.len());

    Ok(())
}
