//! Global view of a Casper-style simulation run
//!
//! This crate holds the message DAG a simulation produces, its finalization
//! pointer and timing records, and the chain walking used to materialize the
//! finalized chain.

pub mod chain;
pub mod snapshot;
pub mod view;

// Re-export key types
pub use chain::{ChainBuilder, ChainLink, ParentChain};
pub use snapshot::{SnapshotFinalization, SnapshotMessage, ViewSnapshot};
pub use view::{log_view_summary, GlobalView, SimulationView, ViewError};

/// Result type for view operations
pub type Result<T> = std::result::Result<T, ViewError>;
