use std::fmt;

use serde::{Deserialize, Serialize};

use super::EdgeId;

/// Handle to a node owned by a [`Graph`](super::Graph).
///
/// Handles are never reused, so a handle to a removed node stays dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Addresses anything that occupies a slot in a rank: a real node or the
/// waypoint an edge keeps at one of its intermediate ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Real(NodeId),
    Waypoint { edge: EdgeId, rank: usize },
}

impl From<NodeId> for NodeKey {
    fn from(id: NodeId) -> Self {
        NodeKey::Real(id)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: Option<String>,
    /// Extent along the in-rank axis.
    pub size: f32,
    /// Extent along the rank axis.
    pub depth: f32,
    pub rank: usize,
    pub position: f32,
    pub location: f32,
    /// Depth of the rank band this node currently sits in.
    pub rank_depth: f32,
    /// Owning edge, set only for virtual waypoint nodes.
    pub edge: Option<EdgeId>,
}

impl Node {
    pub(crate) fn new(size: f32, depth: f32, id: Option<String>) -> Self {
        Self {
            id,
            size,
            depth,
            rank: 0,
            position: 0.0,
            location: 0.0,
            rank_depth: depth,
            edge: None,
        }
    }

    pub(crate) fn waypoint(edge: EdgeId, rank: usize) -> Self {
        Self {
            rank,
            edge: Some(edge),
            ..Self::new(0.0, 0.0, None)
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.edge.is_some()
    }

    pub fn max_position(&self) -> f32 {
        self.position + self.size / 2.0
    }

    pub fn min_position(&self) -> f32 {
        self.position - self.size / 2.0
    }

    /// Rank-axis coordinate where this node's band ends.
    pub fn after_rank(&self) -> f32 {
        self.location + self.rank_depth / 2.0
    }

    /// Rank-axis coordinate where this node's band starts.
    pub fn before_rank(&self) -> f32 {
        self.location - self.rank_depth / 2.0
    }

    pub(crate) fn set_location(&mut self, rank_depth: f32, location: f32) {
        self.rank_depth = rank_depth;
        self.location = location;
    }

    /// Blend toward `target` by `amplitude`; `None` leaves the node alone.
    pub(crate) fn pull_toward(&mut self, target: Option<f32>, amplitude: f32) {
        if let Some(target) = target {
            self.position += (target - self.position) * amplitude;
        }
    }
}

/// Slot storage for real nodes. Slots are tombstoned, not reused.
#[derive(Debug, Default)]
pub(crate) struct NodeStore {
    slots: Vec<Option<Node>>,
}

impl NodeStore {
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        self.slots.push(Some(node));
        NodeId(self.slots.len() - 1)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|node| (NodeId(idx), node)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut Node)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_mut().map(|node| (NodeId(idx), node)))
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extents_follow_size_and_rank_depth() {
        let mut node = Node::new(20.0, 10.0, Some("a".to_string()));
        node.position = 50.0;
        node.set_location(30.0, 100.0);
        assert_eq!(node.min_position(), 40.0);
        assert_eq!(node.max_position(), 60.0);
        assert_eq!(node.before_rank(), 85.0);
        assert_eq!(node.after_rank(), 115.0);
    }

    #[test]
    fn pull_without_target_is_a_no_op() {
        let mut node = Node::new(1.0, 1.0, None);
        node.position = 7.0;
        node.pull_toward(None, 1.5);
        assert_eq!(node.position, 7.0);
        node.pull_toward(Some(9.0), 0.5);
        assert_eq!(node.position, 8.0);
    }

    #[test]
    fn store_never_reuses_slots() {
        let mut store = NodeStore::default();
        let a = store.insert(Node::new(1.0, 1.0, None));
        store.remove(a);
        let b = store.insert(Node::new(1.0, 1.0, None));
        assert_ne!(a, b);
        assert!(store.get(a).is_none());
        assert_eq!(store.len(), 1);
    }
}
