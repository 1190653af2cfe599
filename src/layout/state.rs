use serde::{Deserialize, Serialize};

use super::{EdgeId, NodeId};

/// Full copy of every position the pipeline computes.
///
/// Restoring a snapshot replaces positions wholesale; entries for nodes or
/// edges that no longer exist are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutState {
    pub nodes: Vec<NodeState>,
    pub edges: Vec<EdgeState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub node: NodeId,
    pub position: f32,
    pub location: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeState {
    pub edge: EdgeId,
    pub waypoints: Vec<WaypointState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointState {
    pub rank: usize,
    pub position: f32,
    pub location: f32,
}
