//! Protocol types for Casper-style DAG simulations
//!
//! This crate defines the message model shared by the global view and the
//! finality analyzer: message identities, heights, parent links and the
//! statistics a view reports about itself.

pub mod dag;
pub mod errors;
pub mod message;

pub use dag::ViewStats;
pub use errors::ProtocolError;
pub use message::{Message, MessageId, SimTime};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Version of the message payload format
pub const PROTOCOL_VERSION: &str = "0.1.0";
