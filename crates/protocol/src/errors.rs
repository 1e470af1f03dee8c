//! Protocol errors module

use thiserror::Error;

/// Protocol-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid format: {reason}")]
    InvalidFormat { reason: String },

    #[error("Message id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: String, actual: String },
}
