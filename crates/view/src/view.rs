//! Global View Module
//!
//! This module defines the read surface the analyzer consumes from a
//! simulation run, and an in-memory DAG that simulations and tests use to
//! build one.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use finality_protocol::{Message, MessageId, ProtocolError, SimTime, ViewStats};
use thiserror::Error;
use tracing::{debug, info};

/// View-related errors
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Message not found: {id}")]
    MessageNotFound { id: MessageId },

    #[error("Parent {parent} of message {id} not found")]
    MissingParent { id: MessageId, parent: MessageId },

    #[error("Invalid message: {reason}")]
    InvalidMessage { reason: String },

    #[error("Cannot finalize {proposed}: not a descendant of finalized block {current}")]
    FinalityConflict {
        current: MessageId,
        proposed: MessageId,
    },

    #[error("Chain walk from {start} did not terminate")]
    CycleDetected { start: MessageId },

    #[error("Protocol error: {source}")]
    ProtocolError { source: ProtocolError },

    #[error("I/O error on {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    SerializationError { source: serde_json::Error },
}

impl From<ProtocolError> for ViewError {
    fn from(err: ProtocolError) -> Self {
        ViewError::ProtocolError { source: err }
    }
}

impl From<serde_json::Error> for ViewError {
    fn from(err: serde_json::Error) -> Self {
        ViewError::SerializationError { source: err }
    }
}

/// Read access to the aggregate state of one simulation run.
///
/// Implementations must keep every message reachable from
/// `last_finalized_block` in `messages`, with both timing entries set.
pub trait GlobalView {
    /// All messages observed so far.
    fn messages(&self) -> &BTreeMap<MessageId, Message>;

    /// Messages directly citing `id`. `None` means no children were observed.
    fn children(&self, id: &MessageId) -> Option<&BTreeSet<MessageId>>;

    /// The most recently finalized message.
    fn last_finalized_block(&self) -> Option<&Message>;

    fn when_added(&self, id: &MessageId) -> Option<SimTime>;

    fn when_finalized(&self, id: &MessageId) -> Option<SimTime>;

    /// Current best chain head.
    fn estimate(&self) -> Option<&Message>;

    fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages().get(id)
    }
}

/// In-memory global view of a simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimulationView {
    /// id -> message
    messages: BTreeMap<MessageId, Message>,
    /// id -> ids citing it as a parent
    children: BTreeMap<MessageId, BTreeSet<MessageId>>,
    /// Messages with no children yet
    tips: BTreeSet<MessageId>,
    last_finalized: Option<MessageId>,
    when_added: HashMap<MessageId, SimTime>,
    when_finalized: HashMap<MessageId, SimTime>,
}

impl SimulationView {
    /// Create an empty view
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a view containing only the genesis message, added at time 0.
    pub fn with_genesis() -> (Self, Message) {
        let genesis = Message::genesis();
        let mut view = Self::new();
        view.insert(genesis.clone(), 0);
        (view, genesis)
    }

    /// Add a message observed at simulated time `at`.
    pub fn add_message(&mut self, message: Message, at: SimTime) -> Result<(), ViewError> {
        message.verify_id()?;

        if self.messages.contains_key(&message.id) {
            return Ok(()); // Already exists, ignore
        }

        let mut expected_height = 0;
        for parent_id in &message.parents {
            let parent = self
                .messages
                .get(parent_id)
                .ok_or_else(|| ViewError::MissingParent {
                    id: message.id.clone(),
                    parent: parent_id.clone(),
                })?;
            expected_height = expected_height.max(parent.height + 1);
        }

        if message.height != expected_height {
            return Err(ViewError::InvalidMessage {
                reason: format!(
                    "Message {} has height {}, expected {}",
                    message.id, message.height, expected_height
                ),
            });
        }

        self.insert(message, at);
        Ok(())
    }

    /// Mark `id` as finalized at time `at`.
    ///
    /// Every message on its chain that was not finalized before gets `at` as
    /// its finalization time. The new block must descend from the current
    /// finalized block.
    pub fn finalize(&mut self, id: &MessageId, at: SimTime) -> Result<(), ViewError> {
        if !self.messages.contains_key(id) {
            return Err(ViewError::MessageNotFound { id: id.clone() });
        }

        if let Some(current) = &self.last_finalized {
            if current == id {
                return Ok(());
            }
            if !self.is_chain_ancestor(current, id) {
                return Err(ViewError::FinalityConflict {
                    current: current.clone(),
                    proposed: id.clone(),
                });
            }
        }

        let mut newly_finalized = 0usize;
        let mut cursor = Some(id.clone());
        while let Some(current_id) = cursor {
            if self.when_finalized.contains_key(&current_id) {
                break;
            }
            self.when_finalized.insert(current_id.clone(), at);
            newly_finalized += 1;
            cursor = self
                .messages
                .get(&current_id)
                .and_then(|m| m.chain_parent().cloned());
        }

        self.last_finalized = Some(id.clone());
        debug!(
            "Finalized {} at t={} ({} newly finalized messages)",
            id.short(),
            at,
            newly_finalized
        );
        Ok(())
    }

    /// Whether `ancestor` lies on the chain-parent path of `descendant`.
    pub fn is_chain_ancestor(&self, ancestor: &MessageId, descendant: &MessageId) -> bool {
        let mut cursor = self.messages.get(descendant);
        while let Some(message) = cursor {
            if &message.id == ancestor {
                return true;
            }
            cursor = message
                .chain_parent()
                .and_then(|parent| self.messages.get(parent));
        }
        false
    }

    /// Current tips, highest first
    pub fn tips(&self) -> Vec<&Message> {
        let mut tips: Vec<&Message> = self
            .tips
            .iter()
            .filter_map(|id| self.messages.get(id))
            .collect();
        tips.sort_by(|a, b| b.height.cmp(&a.height).then_with(|| b.id.cmp(&a.id)));
        tips
    }

    /// Get view statistics
    pub fn stats(&self) -> ViewStats {
        let senders: HashSet<u32> = self.messages.values().map(|m| m.sender).collect();

        ViewStats {
            total_messages: self.messages.len(),
            tip_count: self.tips.len(),
            sender_count: senders.len(),
            finalized_count: self.when_finalized.len(),
            earliest_added: self.when_added.values().min().copied(),
            latest_added: self.when_added.values().max().copied(),
        }
    }

    fn insert(&mut self, message: Message, at: SimTime) {
        for parent_id in &message.parents {
            self.children
                .entry(parent_id.clone())
                .or_default()
                .insert(message.id.clone());
            self.tips.remove(parent_id);
        }

        self.tips.insert(message.id.clone());
        self.when_added.insert(message.id.clone(), at);
        self.messages.insert(message.id.clone(), message);
    }
}

impl GlobalView for SimulationView {
    fn messages(&self) -> &BTreeMap<MessageId, Message> {
        &self.messages
    }

    fn children(&self, id: &MessageId) -> Option<&BTreeSet<MessageId>> {
        self.children.get(id)
    }

    fn last_finalized_block(&self) -> Option<&Message> {
        self.last_finalized
            .as_ref()
            .and_then(|id| self.messages.get(id))
    }

    fn when_added(&self, id: &MessageId) -> Option<SimTime> {
        self.when_added.get(id).copied()
    }

    fn when_finalized(&self, id: &MessageId) -> Option<SimTime> {
        self.when_finalized.get(id).copied()
    }

    /// Highest tip; ties go to the greatest id.
    fn estimate(&self) -> Option<&Message> {
        self.tips().into_iter().next()
    }
}

/// Log a one-line summary of a view.
pub fn log_view_summary(view: &SimulationView) {
    let stats = view.stats();
    info!(
        "View has {} messages, {} tips, {} senders, {} finalized",
        stats.total_messages, stats.tip_count, stats.sender_count, stats.finalized_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_basic_operations() {
        let (mut view, genesis) = SimulationView::with_genesis();
        let a = Message::new(1, 1, &[&genesis]);

        view.add_message(a.clone(), 3).unwrap();

        assert_eq!(view.messages().len(), 2);
        assert_eq!(view.when_added(&a.id), Some(3));
        assert_eq!(view.message(&a.id), Some(&a));
        assert!(view.children(&genesis.id).unwrap().contains(&a.id));
        assert!(view.children(&a.id).is_none());

        // Adding again is a no-op
        view.add_message(a.clone(), 9).unwrap();
        assert_eq!(view.when_added(&a.id), Some(3));
    }

    #[test]
    fn test_view_rejects_unknown_parent() {
        let (mut view, genesis) = SimulationView::with_genesis();
        let a = Message::new(1, 1, &[&genesis]);
        let b = Message::new(2, 1, &[&a]);

        let result = view.add_message(b, 1);
        assert!(matches!(result, Err(ViewError::MissingParent { .. })));
    }

    #[test]
    fn test_view_rejects_wrong_height() {
        let (mut view, genesis) = SimulationView::with_genesis();
        let bad = Message::from_parts(1, 1, 5, vec![genesis.id.clone()]);

        let result = view.add_message(bad, 1);
        assert!(matches!(result, Err(ViewError::InvalidMessage { .. })));
    }

    #[test]
    fn test_view_rejects_tampered_id() {
        let (mut view, genesis) = SimulationView::with_genesis();
        let mut a = Message::new(1, 1, &[&genesis]);
        a.sender = 9;

        let result = view.add_message(a, 1);
        assert!(matches!(result, Err(ViewError::ProtocolError { .. })));
    }

    #[test]
    fn test_tips_and_estimate() {
        let (mut view, genesis) = SimulationView::with_genesis();
        let a = Message::new(1, 1, &[&genesis]);
        let b = Message::new(2, 1, &[&genesis]);
        let c = Message::new(1, 2, &[&a]);

        view.add_message(a.clone(), 1).unwrap();
        view.add_message(b.clone(), 1).unwrap();
        view.add_message(c.clone(), 2).unwrap();

        let tips = view.tips();
        assert_eq!(tips.len(), 2);
        assert_eq!(tips[0].id, c.id);
        assert_eq!(view.estimate().unwrap().id, c.id);
    }

    #[test]
    fn test_finalize_marks_chain() {
        let (mut view, genesis) = SimulationView::with_genesis();
        let a = Message::new(1, 1, &[&genesis]);
        let b = Message::new(2, 1, &[&a]);
        view.add_message(a.clone(), 1).unwrap();
        view.add_message(b.clone(), 2).unwrap();

        view.finalize(&a.id, 5).unwrap();
        assert_eq!(view.when_finalized(&genesis.id), Some(5));
        assert_eq!(view.when_finalized(&a.id), Some(5));
        assert_eq!(view.when_finalized(&b.id), None);

        view.finalize(&b.id, 8).unwrap();
        assert_eq!(view.when_finalized(&a.id), Some(5));
        assert_eq!(view.when_finalized(&b.id), Some(8));
        assert_eq!(view.last_finalized_block().unwrap().id, b.id);
    }

    #[test]
    fn test_finalize_rejects_conflicting_branch() {
        let (mut view, genesis) = SimulationView::with_genesis();
        let a = Message::new(1, 1, &[&genesis]);
        let b = Message::new(2, 1, &[&genesis]);
        view.add_message(a.clone(), 1).unwrap();
        view.add_message(b.clone(), 1).unwrap();

        view.finalize(&a.id, 3).unwrap();
        let result = view.finalize(&b.id, 4);
        assert!(matches!(result, Err(ViewError::FinalityConflict { .. })));
        assert_eq!(view.last_finalized_block().unwrap().id, a.id);
    }

    #[test]
    fn test_finalize_unknown_message() {
        let mut view = SimulationView::new();
        let genesis = Message::genesis();
        let result = view.finalize(&genesis.id, 1);
        assert!(matches!(result, Err(ViewError::MessageNotFound { .. })));
    }

    #[test]
    fn test_view_stats() {
        let (mut view, genesis) = SimulationView::with_genesis();
        for sender in 1..=3 {
            let message = Message::new(sender, 1, &[&genesis]);
            view.add_message(message, sender as u64 * 2).unwrap();
        }

        let stats = view.stats();
        assert_eq!(stats.total_messages, 4);
        assert_eq!(stats.tip_count, 3);
        assert_eq!(stats.sender_count, 4); // genesis sender included
        assert_eq!(stats.finalized_count, 0);
        assert_eq!(stats.earliest_added, Some(0));
        assert_eq!(stats.latest_added, Some(6));
    }
}
