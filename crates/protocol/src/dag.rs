//! Shared DAG-related structures.
//!
//! These helper types describe metadata that multiple crates need to
//! understand, such as statistics produced by global view implementations.

use crate::message::SimTime;

/// View statistics for monitoring and observability.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewStats {
    /// Total number of messages in the view
    pub total_messages: usize,
    /// Number of tips (messages with no recorded children)
    pub tip_count: usize,
    /// Number of distinct senders seen
    pub sender_count: usize,
    /// Number of messages with a finalization time
    pub finalized_count: usize,
    /// Earliest simulated time a message was added
    pub earliest_added: Option<SimTime>,
    /// Latest simulated time a message was added
    pub latest_added: Option<SimTime>,
}
