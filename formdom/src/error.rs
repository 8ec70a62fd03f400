use thiserror::Error;

use crate::NodeId;

/// Errors raised by structural document operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The node id does not belong to this document.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Appending would make a node its own ancestor.
    #[error("cannot append {child} under its own descendant {parent}")]
    Cycle { parent: NodeId, child: NodeId },

    /// The document root cannot be moved or removed.
    #[error("the document root cannot be detached")]
    DetachRoot,
}
