//! Finality Report Module
//!
//! Gathers every analyzer metric into one summary. Metrics that are
//! undefined for a degenerate view (no messages, nothing bivalent) are
//! reported as absent instead of failing the whole report.

use std::fmt;

use finality_protocol::MessageId;
use finality_view::{ChainBuilder, GlobalView};
use tracing::debug;

use crate::analyzer::Analyzer;
use crate::errors::AnalysisError;
use crate::Result;

/// Summary of all finality metrics for one view
#[derive(Debug, Clone, PartialEq)]
pub struct FinalityReport {
    pub num_messages: usize,
    pub num_safe_messages: usize,
    pub num_unsafe_messages: usize,
    pub num_bivalent_messages: usize,
    /// Highest safe message
    pub safe_tip: Option<MessageId>,
    pub safe_tip_height: Option<u64>,
    /// Absent for an empty view
    pub prop_safe_messages: Option<f64>,
    /// Absent when the view has no estimate
    pub safe_to_tip_length: Option<i64>,
    /// Absent when nothing is bivalent
    pub bivalent_message_depth: Option<u64>,
    pub bivalent_message_branching_factor: f64,
    /// Absent when nothing is bivalent
    pub bivalent_message_branching_factor_estimate: Option<f64>,
    pub latency_to_finality: f64,
    pub orphan_rate: f64,
}

impl FinalityReport {
    /// Compute every metric from the analyzer's current view.
    pub fn collect<V: GlobalView, B: ChainBuilder>(analyzer: &Analyzer<'_, V, B>) -> Result<Self> {
        let safe_tip = analyzer.safe_tip()?;

        let report = FinalityReport {
            num_messages: analyzer.num_messages(),
            num_safe_messages: analyzer.num_safe_messages()?,
            num_unsafe_messages: analyzer.num_unsafe_messages()?,
            num_bivalent_messages: analyzer.num_bivalent_messages()?,
            safe_tip: safe_tip.map(|tip| tip.id.clone()),
            safe_tip_height: safe_tip.map(|tip| tip.height),
            prop_safe_messages: undefined_as_none(analyzer.prop_safe_messages())?,
            safe_to_tip_length: undefined_as_none(analyzer.safe_to_tip_length())?,
            bivalent_message_depth: undefined_as_none(analyzer.bivalent_message_depth())?,
            bivalent_message_branching_factor: analyzer.bivalent_message_branching_factor()?,
            bivalent_message_branching_factor_estimate: undefined_as_none(
                analyzer.bivalent_message_branching_factor_estimate(),
            )?,
            latency_to_finality: analyzer.latency_to_finality()?,
            orphan_rate: analyzer.orphan_rate()?,
        };

        debug!("Collected finality report: {:?}", report);
        Ok(report)
    }
}

/// Map the errors a degenerate view produces to `None`; keep the rest.
fn undefined_as_none<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AnalysisError::EmptyView)
        | Err(AnalysisError::NoBivalentMessages)
        | Err(AnalysisError::NoEstimate) => Ok(None),
        Err(e) => Err(e),
    }
}

fn write_optional<T: fmt::Display>(f: &mut fmt::Formatter<'_>, label: &str, value: &Option<T>) -> fmt::Result {
    match value {
        Some(value) => writeln!(f, "   {}: {}", label, value),
        None => writeln!(f, "   {}: n/a", label),
    }
}

impl fmt::Display for FinalityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Messages:")?;
        writeln!(f, "   Total: {}", self.num_messages)?;
        writeln!(f, "   Safe: {}", self.num_safe_messages)?;
        writeln!(f, "   Unsafe: {}", self.num_unsafe_messages)?;
        writeln!(f, "   Bivalent: {}", self.num_bivalent_messages)?;
        write_optional(f, "Safe proportion", &self.prop_safe_messages.map(|p| format!("{:.3}", p)))?;

        writeln!(f, "Safe tip:")?;
        write_optional(f, "Id", &self.safe_tip)?;
        write_optional(f, "Height", &self.safe_tip_height)?;
        write_optional(f, "Safe-to-tip length", &self.safe_to_tip_length)?;

        writeln!(f, "Frontier:")?;
        write_optional(f, "Bivalent depth", &self.bivalent_message_depth)?;
        writeln!(
            f,
            "   Branching factor: {:.3}",
            self.bivalent_message_branching_factor
        )?;
        write_optional(
            f,
            "Branching factor estimate",
            &self
                .bivalent_message_branching_factor_estimate
                .map(|b| format!("{:.3}", b)),
        )?;

        writeln!(f, "Finality:")?;
        writeln!(f, "   Latency to finality: {:.3}", self.latency_to_finality)?;
        write!(f, "   Orphan rate: {:.3}", self.orphan_rate)
    }
}
