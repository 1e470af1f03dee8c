//! Analysis errors module

use finality_protocol::MessageId;
use finality_view::ViewError;
use thiserror::Error;

/// Errors raised by analyzer queries on degenerate or inconsistent views
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("View contains no messages")]
    EmptyView,

    #[error("No bivalent messages: every message has been decided")]
    NoBivalentMessages,

    #[error("View has no estimate")]
    NoEstimate,

    #[error("Finalized message {id} is missing its {field} time")]
    MissingTiming { id: MessageId, field: &'static str },

    #[error("Chain error: {source}")]
    ChainError { source: ViewError },
}

impl From<ViewError> for AnalysisError {
    fn from(err: ViewError) -> Self {
        AnalysisError::ChainError { source: err }
    }
}
