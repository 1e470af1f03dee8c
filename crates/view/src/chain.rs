//! Chain walking over a global view.

use finality_protocol::MessageId;

use crate::view::{GlobalView, ViewError};

/// A message and the chain parent it builds on.
pub type ChainLink = (MessageId, Option<MessageId>);

/// Produces the ancestor path between two messages.
pub trait ChainBuilder {
    /// Walk from `start` back toward `end` (exclusive), or to the root when
    /// `end` is `None`. Links are ordered from `start` downwards.
    fn build_chain(
        &self,
        view: &dyn GlobalView,
        start: &MessageId,
        end: Option<&MessageId>,
    ) -> Result<Vec<ChainLink>, ViewError>;
}

/// Follows each message's first parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentChain;

impl ChainBuilder for ParentChain {
    fn build_chain(
        &self,
        view: &dyn GlobalView,
        start: &MessageId,
        end: Option<&MessageId>,
    ) -> Result<Vec<ChainLink>, ViewError> {
        let mut links = Vec::new();
        let mut current = view
            .message(start)
            .ok_or_else(|| ViewError::MessageNotFound { id: start.clone() })?;

        loop {
            if end == Some(&current.id) {
                break;
            }

            // A chain can't be longer than the view.
            if links.len() >= view.messages().len() {
                return Err(ViewError::CycleDetected {
                    start: start.clone(),
                });
            }

            let parent = current.chain_parent().cloned();
            links.push((current.id.clone(), parent.clone()));

            match parent {
                Some(parent_id) => {
                    current = view
                        .message(&parent_id)
                        .ok_or(ViewError::MessageNotFound { id: parent_id })?;
                }
                None => break,
            }
        }

        Ok(links)
    }
}
