use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::node::{Node, NodeId, NodeKey, NodeStore};
use super::port::{Port, PortPoint};
use super::state::{EdgeState, WaypointState};

/// Handle to an edge owned by a [`Graph`](super::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub(crate) usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Virtual node an edge keeps at a rank it passes through.
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub node: Node,
    pub offset_position: f32,
}

impl Waypoint {
    fn new(edge: EdgeId, rank: usize) -> Self {
        Self {
            node: Node::waypoint(edge, rank),
            offset_position: 0.0,
        }
    }

    fn resolve(&self, edge: EdgeId, rank: usize) -> PortPoint {
        PortPoint {
            key: NodeKey::Waypoint { edge, rank },
            rank: self.node.rank,
            position: self.node.position + self.offset_position,
            location: self.node.location,
            before_rank: self.node.before_rank(),
            after_rank: self.node.after_rank(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) id: EdgeId,
    pub from: Port,
    pub to: Port,
    pub label_size: Option<f32>,
    pub(crate) reverse: bool,
    pub(crate) waypoints: BTreeMap<usize, Waypoint>,
    pub(crate) label_rank: Option<usize>,
}

impl Edge {
    pub(crate) fn new(id: EdgeId, from: Port, to: Port, label_size: Option<f32>) -> Self {
        Self {
            id,
            from,
            to,
            label_size,
            reverse: false,
            waypoints: BTreeMap::new(),
            label_rank: None,
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// True when the nominal direction was flipped to keep ranking acyclic.
    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    pub fn has_label(&self) -> bool {
        self.label_size.is_some()
    }

    pub fn min_rank_node(&self) -> NodeId {
        if self.reverse { self.to.node } else { self.from.node }
    }

    pub fn max_rank_node(&self) -> NodeId {
        if self.reverse { self.from.node } else { self.to.node }
    }

    /// Minimum rank gap this edge imposes between its endpoints.
    pub(crate) fn rank_gap(&self) -> usize {
        if self.has_label() { 2 } else { 1 }
    }

    pub(crate) fn touches(&self, node: NodeId) -> bool {
        self.from.node == node || self.to.node == node
    }

    pub(crate) fn span(&self, nodes: &NodeStore) -> Option<(usize, usize)> {
        let min = nodes.get(self.min_rank_node())?.rank;
        let max = nodes.get(self.max_rank_node())?.rank;
        Some((min, max))
    }

    pub(crate) fn intermediate_ranks(&self, nodes: &NodeStore) -> Range<usize> {
        match self.span(nodes) {
            Some((min, max)) if max > min + 1 => (min + 1)..max,
            _ => 0..0,
        }
    }

    pub fn waypoint(&self, rank: usize) -> Option<&Waypoint> {
        self.waypoints.get(&rank)
    }

    pub fn waypoints(&self) -> impl Iterator<Item = (usize, &Waypoint)> {
        self.waypoints.iter().map(|(rank, waypoint)| (*rank, waypoint))
    }

    pub(crate) fn waypoint_mut(&mut self, rank: usize) -> &mut Waypoint {
        let id = self.id;
        self.waypoints
            .entry(rank)
            .or_insert_with(|| Waypoint::new(id, rank))
    }

    /// Drop waypoints left over from an earlier ranking.
    pub(crate) fn prune_waypoints(&mut self, nodes: &NodeStore) {
        let keep = self.intermediate_ranks(nodes);
        self.waypoints.retain(|rank, _| keep.contains(rank));
        if self.label_rank.is_some_and(|rank| !keep.contains(&rank)) {
            self.label_rank = None;
        }
    }

    pub fn label_waypoint(&self) -> Option<&Waypoint> {
        self.label_rank.and_then(|rank| self.waypoints.get(&rank))
    }

    /// The port this edge presents at `rank`, if it has one there.
    pub(crate) fn port_at(&self, nodes: &NodeStore, rank: usize) -> Option<PortPoint> {
        let from = nodes.get(self.from.node)?;
        if from.rank == rank {
            return Some(self.from.resolve(from));
        }
        let to = nodes.get(self.to.node)?;
        if to.rank == rank {
            return Some(self.to.resolve(to));
        }
        let (min, max) = self.span(nodes)?;
        if rank > min && rank < max {
            return self
                .waypoints
                .get(&rank)
                .map(|waypoint| waypoint.resolve(self.id, rank));
        }
        None
    }

    pub(crate) fn distance_between(&self, nodes: &NodeStore, from: usize, to: usize) -> Option<f32> {
        let a = self.port_at(nodes, from)?;
        let b = self.port_at(nodes, to)?;
        Some((a.position - b.position).abs())
    }

    pub(crate) fn state(&self, nodes: &NodeStore) -> EdgeState {
        let waypoints = self
            .intermediate_ranks(nodes)
            .filter_map(|rank| {
                self.waypoints.get(&rank).map(|waypoint| WaypointState {
                    rank,
                    position: waypoint.node.position,
                    location: waypoint.node.location,
                })
            })
            .collect();
        EdgeState {
            edge: self.id,
            waypoints,
        }
    }

    pub(crate) fn set_state(&mut self, nodes: &NodeStore, state: &EdgeState) {
        for rank in self.intermediate_ranks(nodes) {
            let Some(saved) = state.waypoints.iter().find(|w| w.rank == rank) else {
                continue;
            };
            let waypoint = self.waypoint_mut(rank);
            waypoint.node.position = saved.position;
            waypoint.node.location = saved.location;
        }
    }

    pub(crate) fn dot_line(&self, nodes: &NodeStore) -> Option<String> {
        let from = nodes.get(self.from.node)?;
        let to = nodes.get(self.to.node)?;
        Some(format!(
            "{} -> {};",
            self.from.dot_id(from),
            self.to.dot_id(to)
        ))
    }
}

/// Slot storage for edges, in insertion order. Slots are tombstoned.
#[derive(Debug, Default)]
pub(crate) struct EdgeStore {
    slots: Vec<Option<Edge>>,
}

impl EdgeStore {
    pub(crate) fn insert(&mut self, from: Port, to: Port, label_size: Option<f32>) -> EdgeId {
        let id = EdgeId(self.slots.len());
        self.slots.push(Some(Edge::new(id, from, to, label_size)));
        id
    }

    pub(crate) fn get(&self, id: EdgeId) -> Option<&Edge> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub(crate) fn remove(&mut self, id: EdgeId) -> Option<Edge> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    pub(crate) fn ids(&self) -> Vec<EdgeId> {
        self.iter().map(|edge| edge.id).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    pub(crate) fn len(&self) -> usize {
        self.iter().count()
    }
}
