//! Snapshot loading
//!
//! A snapshot is a JSON document describing one simulation run: every
//! message with the time it was added, followed by the finalization events
//! in the order they happened. Replaying it yields a [`SimulationView`].

use std::fs;
use std::path::Path;

use finality_protocol::{Message, MessageId, SimTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::view::{GlobalView, SimulationView, ViewError};

/// A message together with the time it was observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub message: Message,
    pub added_at: SimTime,
}

/// A finalization event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFinalization {
    pub id: MessageId,
    pub at: SimTime,
}

/// Serialized form of a simulation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewSnapshot {
    /// Messages, parents before children
    pub messages: Vec<SnapshotMessage>,
    /// Finalization events in order
    #[serde(default)]
    pub finalized: Vec<SnapshotFinalization>,
}

impl ViewSnapshot {
    /// Read a snapshot from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ViewError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ViewError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ViewError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the snapshot as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ViewError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ViewError::IoError {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Capture a view. Finalization is recorded as a single event on the
    /// last finalized block per distinct finalization time, oldest first.
    pub fn from_view(view: &SimulationView) -> Self {
        let mut messages: Vec<SnapshotMessage> = view
            .messages()
            .values()
            .map(|message| SnapshotMessage {
                message: message.clone(),
                added_at: view.when_added(&message.id).unwrap_or_default(),
            })
            .collect();
        messages.sort_by(|a, b| {
            a.message
                .height
                .cmp(&b.message.height)
                .then_with(|| a.message.id.cmp(&b.message.id))
        });

        // The finalized chain, walked from the tip: keep the highest message
        // finalized at each time.
        let mut finalized: Vec<SnapshotFinalization> = Vec::new();
        let mut cursor = view.last_finalized_block();
        while let Some(message) = cursor {
            if let Some(at) = view.when_finalized(&message.id) {
                if finalized.last().map(|f| f.at) != Some(at) {
                    finalized.push(SnapshotFinalization {
                        id: message.id.clone(),
                        at,
                    });
                }
            }
            cursor = message.chain_parent().and_then(|parent| view.message(parent));
        }
        finalized.reverse();

        ViewSnapshot {
            messages,
            finalized,
        }
    }

    /// Replay the snapshot into a fresh view.
    pub fn into_view(self) -> Result<SimulationView, ViewError> {
        let mut view = SimulationView::new();
        let message_count = self.messages.len();
        let finalization_count = self.finalized.len();

        for entry in self.messages {
            view.add_message(entry.message, entry.added_at)?;
        }

        for event in &self.finalized {
            view.finalize(&event.id, event.at)?;
        }

        info!(
            "Replayed snapshot with {} messages and {} finalization events",
            message_count, finalization_count
        );
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn forked_view() -> (SimulationView, Message, Message, Message) {
        let (mut view, genesis) = SimulationView::with_genesis();
        let a = Message::new(1, 1, &[&genesis]);
        let b = Message::new(2, 1, &[&genesis]);
        let c = Message::new(1, 2, &[&a]);
        view.add_message(a.clone(), 1).unwrap();
        view.add_message(b.clone(), 2).unwrap();
        view.add_message(c.clone(), 4).unwrap();
        view.finalize(&a.id, 5).unwrap();
        view.finalize(&c.id, 7).unwrap();
        (view, a, b, c)
    }

    #[test]
    fn test_snapshot_file_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.json");
        let (view, a, b, c) = forked_view();

        ViewSnapshot::from_view(&view).save(&path).unwrap();
        let restored = ViewSnapshot::load(&path).unwrap().into_view().unwrap();

        assert_eq!(restored.messages().len(), 4);
        assert_eq!(restored.when_added(&b.id), Some(2));
        assert_eq!(restored.when_finalized(&a.id), Some(5));
        assert_eq!(restored.when_finalized(&c.id), Some(7));
        assert_eq!(restored.when_finalized(&b.id), None);
        assert_eq!(restored.last_finalized_block().unwrap().id, c.id);
    }

    #[test]
    fn test_snapshot_missing_file() {
        let result = ViewSnapshot::load("does/not/exist.json");
        assert!(matches!(result, Err(ViewError::IoError { .. })));
    }

    #[test]
    fn test_snapshot_without_finalized_field() {
        let genesis = Message::genesis();
        let json = format!(
            r#"{{"messages":[{{"message":{},"added_at":0}}]}}"#,
            serde_json::to_string(&genesis).unwrap()
        );

        let view = ViewSnapshot::from_json(&json).unwrap().into_view().unwrap();
        assert_eq!(view.messages().len(), 1);
        assert!(view.last_finalized_block().is_none());
    }

    #[test]
    fn test_snapshot_out_of_order_messages_fail() {
        let (view, ..) = forked_view();
        let mut snapshot = ViewSnapshot::from_view(&view);
        snapshot.messages.reverse();

        let result = snapshot.into_view();
        assert!(matches!(result, Err(ViewError::MissingParent { .. })));
    }

    #[test]
    fn test_snapshot_malformed_json() {
        let result = ViewSnapshot::from_json("{not json");
        assert!(matches!(result, Err(ViewError::SerializationError { .. })));
    }
}
