//! Message definitions.
//!
//! A message is a block (or vote) in the consensus DAG produced by a
//! simulation. Messages are immutable once created and identified by the
//! Blake3 hash of their canonical payload.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;
use crate::PROTOCOL_VERSION;

/// Simulated time, in ticks of the simulation clock.
pub type SimTime = u64;

/// Unique message identity (64-character lowercase hex Blake3 hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    /// Parse an id from its hex form.
    pub fn from_hex(hex: &str) -> Result<Self, ProtocolError> {
        if hex.len() != 64 {
            return Err(ProtocolError::InvalidFormat {
                reason: format!("Message id must be 64 hex characters, got {}", hex.len()),
            });
        }

        if !hex
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(ProtocolError::InvalidFormat {
                reason: format!("Message id is not lowercase hex: {}", hex),
            });
        }

        Ok(MessageId(hex.to_string()))
    }

    /// Full hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines and tables.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MessageId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MessageId::from_hex(&value)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

/// A single message in the consensus DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID (Blake3 hash of the payload)
    pub id: MessageId,
    /// Validator that produced this message
    pub sender: u32,
    /// Local sequence number from the sender
    pub sequence: u64,
    /// Distance from genesis along the longest parent path
    pub height: u64,
    /// Parent message IDs; the first entry is the chain parent
    pub parents: Vec<MessageId>,
}

impl Message {
    /// The deterministic genesis message every simulation starts from.
    pub fn genesis() -> Self {
        Self::from_parts(0, 0, 0, Vec::new())
    }

    /// Create a message citing `parents`. The first parent is the block this
    /// message builds on; its height is one more than the highest parent.
    pub fn new(sender: u32, sequence: u64, parents: &[&Message]) -> Self {
        let height = parents
            .iter()
            .map(|parent| parent.height + 1)
            .max()
            .unwrap_or(0);
        let parent_ids = parents.iter().map(|parent| parent.id.clone()).collect();

        Self::from_parts(sender, sequence, height, parent_ids)
    }

    /// Create a message from raw fields, computing its id.
    pub fn from_parts(sender: u32, sequence: u64, height: u64, parents: Vec<MessageId>) -> Self {
        let id = Self::compute_id(sender, sequence, height, &parents);

        Message {
            id,
            sender,
            sequence,
            height,
            parents,
        }
    }

    /// Hash the canonical payload of a message.
    pub fn compute_id(sender: u32, sequence: u64, height: u64, parents: &[MessageId]) -> MessageId {
        let parents = parents
            .iter()
            .map(MessageId::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let payload = format!(
            "CASPER_MESSAGE\n\
             version:{}\n\
             sender:{}\n\
             sequence:{}\n\
             height:{}\n\
             parents:{}",
            PROTOCOL_VERSION, sender, sequence, height, parents
        );

        MessageId(blake3::hash(payload.as_bytes()).to_hex().to_string())
    }

    /// Check that the stored id matches the payload.
    pub fn verify_id(&self) -> Result<(), ProtocolError> {
        let expected = Self::compute_id(self.sender, self.sequence, self.height, &self.parents);
        if expected != self.id {
            return Err(ProtocolError::IdMismatch {
                expected: expected.to_string(),
                actual: self.id.to_string(),
            });
        }
        Ok(())
    }

    /// The parent this message extends, if any.
    pub fn chain_parent(&self) -> Option<&MessageId> {
        self.parents.first()
    }

    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }
}
