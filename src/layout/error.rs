use thiserror::Error;

use super::{EdgeId, NodeId};

/// Errors raised while building or mutating a [`Graph`](super::Graph).
///
/// Every variant is raised before the graph is touched, so a failed call
/// never leaves a half-built edge behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("self edges are not supported (node {0})")]
    SelfEdge(NodeId),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),
}
