mod edge;
mod error;
mod node;
mod pipeline;
mod port;
mod rank;
mod ranking;
mod routing;
mod state;
mod transform;
mod watch;

pub use edge::{Edge, EdgeId, Waypoint};
pub use error::LayoutError;
pub use node::{Node, NodeId, NodeKey};
pub use pipeline::{Checkpoint, LayoutOptions, LayoutSteps};
pub use port::{Port, PortPoint, PortSide};
pub use rank::Rank;
pub use routing::{PathCommand, Route};
pub use state::{EdgeState, LayoutState, NodeState, WaypointState};
pub use transform::{CoordinateTransform, Direction, FnTransform};
pub use watch::{EdgeEvent, NodeEvent, Observers};

use crate::config::LayoutSettings;
use edge::EdgeStore;
use node::NodeStore;
use ranking::{Incidence, adjust_ports, assign_ranks};
use routing::edge_route;
use std::collections::BTreeMap;
use std::fmt;

/// Either end of an edge: a bare node gets an automatic port.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Node(NodeId),
    Port(Port),
}

impl Endpoint {
    fn into_port(self, side: PortSide) -> Port {
        match self {
            Endpoint::Node(node) => Port::auto(node, side),
            Endpoint::Port(port) => port,
        }
    }
}

impl From<NodeId> for Endpoint {
    fn from(node: NodeId) -> Self {
        Endpoint::Node(node)
    }
}

impl From<Port> for Endpoint {
    fn from(port: Port) -> Self {
        Endpoint::Port(port)
    }
}

/// Owns every node and edge and runs the layered layout over them.
///
/// Positions live on two engine axes: `position` inside a rank and
/// `location` along the ranks. The transform supplied at construction maps
/// them to output coordinates.
pub struct Graph {
    transform: Box<dyn CoordinateTransform>,
    settings: LayoutSettings,
    nodes: NodeStore,
    edges: EdgeStore,
    node_watch: BTreeMap<NodeId, Observers<NodeEvent>>,
    edge_watch: BTreeMap<EdgeId, Observers<EdgeEvent>>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("settings", &self.settings)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .finish()
    }
}

impl Graph {
    pub fn new(transform: impl CoordinateTransform + 'static, settings: LayoutSettings) -> Self {
        Self {
            transform: Box::new(transform),
            settings,
            nodes: NodeStore::default(),
            edges: EdgeStore::default(),
            node_watch: BTreeMap::new(),
            edge_watch: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn transform(&self) -> &dyn CoordinateTransform {
        self.transform.as_ref()
    }

    // ── Construction ─────────────────────────────────────────────────

    pub fn add_node(&mut self, size: f32, depth: f32, id: impl Into<String>) -> NodeId {
        self.nodes.insert(Node::new(size, depth, Some(id.into())))
    }

    /// Port with fixed offsets that the pipeline leaves alone.
    pub fn port(&self, node: NodeId, offset_position: f32, offset_location: f32) -> Port {
        Port::new(node, offset_position, offset_location)
    }

    pub fn auto_port(&self, node: NodeId, incoming: bool) -> Port {
        let side = if incoming {
            PortSide::Incoming
        } else {
            PortSide::Outgoing
        };
        Port::auto(node, side)
    }

    pub fn add_edge(
        &mut self,
        from: impl Into<Endpoint>,
        to: impl Into<Endpoint>,
        label_size: Option<f32>,
    ) -> Result<EdgeId, LayoutError> {
        let from = from.into().into_port(PortSide::Outgoing);
        let to = to.into().into_port(PortSide::Incoming);
        for port in [&from, &to] {
            if !self.nodes.contains(port.node) {
                return Err(LayoutError::UnknownNode(port.node));
            }
        }
        if from.node == to.node {
            return Err(LayoutError::SelfEdge(from.node));
        }
        Ok(self.edges.insert(from, to, label_size))
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        if !self.nodes.contains(id) {
            return None;
        }
        let incident: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|edge| edge.touches(id))
            .map(Edge::id)
            .collect();
        self.remove_edges(&incident);
        if let Some(mut observers) = self.node_watch.remove(&id) {
            observers.notify(None);
        }
        self.nodes.remove(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(id)?;
        if let Some(mut observers) = self.edge_watch.remove(&id) {
            observers.notify(None);
        }
        Some(edge)
    }

    pub fn remove_edges(&mut self, ids: &[EdgeId]) -> Vec<Edge> {
        ids.iter().filter_map(|id| self.remove_edge(*id)).collect()
    }

    // ── Lookup ───────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_by_key(&self, key: NodeKey) -> Option<&Node> {
        match key {
            NodeKey::Real(id) => self.nodes.get(id),
            NodeKey::Waypoint { edge, rank } => {
                self.edges.get(edge)?.waypoint(rank).map(|w| &w.node)
            }
        }
    }

    pub(crate) fn node_by_key_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        match key {
            NodeKey::Real(id) => self.nodes.get_mut(id),
            NodeKey::Waypoint { edge, rank } => self
                .edges
                .get_mut(edge)?
                .waypoints
                .get_mut(&rank)
                .map(|w| &mut w.node),
        }
    }

    // ── Geometry ─────────────────────────────────────────────────────

    pub fn node_xy(&self, id: NodeId) -> Option<(f32, f32)> {
        let node = self.nodes.get(id)?;
        Some(self.transform.transform(node.position, node.location))
    }

    /// Move a node in output coordinates and notify it and its edges.
    pub fn set_node_xy(&mut self, id: NodeId, x: f32, y: f32) -> Result<(), LayoutError> {
        let (position, location) = self.transform.inverse_transform(x, y);
        let node = self.nodes.get_mut(id).ok_or(LayoutError::UnknownNode(id))?;
        node.position = position;
        node.location = location;

        let incident: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|edge| edge.touches(id))
            .map(Edge::id)
            .collect();
        self.notify_node(id);
        for edge in incident {
            self.notify_edge(edge);
        }
        Ok(())
    }

    pub fn port_at(&self, edge: EdgeId, rank: usize) -> Option<PortPoint> {
        self.edges.get(edge)?.port_at(&self.nodes, rank)
    }

    pub fn distance_between(&self, edge: EdgeId, from: usize, to: usize) -> Option<f32> {
        self.edges.get(edge)?.distance_between(&self.nodes, from, to)
    }

    pub fn route(&self, edge: EdgeId) -> Option<Route> {
        let edge = self.edges.get(edge)?;
        Some(edge_route(
            edge,
            &self.nodes,
            self.transform.as_ref(),
            self.settings.arrow_length,
        ))
    }

    /// Centre of the label waypoint in output coordinates.
    pub fn label_xy(&self, edge: EdgeId) -> Option<(f32, f32)> {
        label_xy(self.edges.get(edge)?, self.transform.as_ref())
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn watch_node(
        &mut self,
        id: NodeId,
        callback: impl FnMut(Option<&NodeEvent>) + 'static,
    ) -> Result<(), LayoutError> {
        if !self.nodes.contains(id) {
            return Err(LayoutError::UnknownNode(id));
        }
        self.node_watch.entry(id).or_default().subscribe(callback);
        Ok(())
    }

    pub fn watch_edge(
        &mut self,
        id: EdgeId,
        callback: impl FnMut(Option<&EdgeEvent>) + 'static,
    ) -> Result<(), LayoutError> {
        if self.edges.get(id).is_none() {
            return Err(LayoutError::UnknownEdge(id));
        }
        self.edge_watch.entry(id).or_default().subscribe(callback);
        Ok(())
    }

    /// Push current geometry to every subscriber.
    pub fn refresh(&mut self) {
        let ids: Vec<NodeId> = self.node_watch.keys().copied().collect();
        for id in ids {
            self.notify_node(id);
        }
        let ids: Vec<EdgeId> = self.edge_watch.keys().copied().collect();
        for id in ids {
            self.notify_edge(id);
        }
    }

    fn notify_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let Some(observers) = self.node_watch.get_mut(&id) else {
            return;
        };
        let (x, y) = self.transform.transform(node.position, node.location);
        let event = NodeEvent {
            node: id,
            x,
            y,
            position: node.position,
            location: node.location,
        };
        observers.notify(Some(&event));
    }

    fn notify_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.get(id) else {
            return;
        };
        let Some(observers) = self.edge_watch.get_mut(&id) else {
            return;
        };
        let transform = self.transform.as_ref();
        let event = EdgeEvent {
            edge: id,
            route: edge_route(edge, &self.nodes, transform, self.settings.arrow_length),
            label: label_xy(edge, transform),
        };
        observers.notify(Some(&event));
    }

    // ── Snapshot & export ────────────────────────────────────────────

    pub fn state(&self) -> LayoutState {
        LayoutState {
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| NodeState {
                    node: id,
                    position: node.position,
                    location: node.location,
                })
                .collect(),
            edges: self.edges.iter().map(|edge| edge.state(&self.nodes)).collect(),
        }
    }

    /// Restore positions from a snapshot, then refresh subscribers.
    pub fn set_state(&mut self, state: &LayoutState) {
        for saved in &state.nodes {
            if let Some(node) = self.nodes.get_mut(saved.node) {
                node.position = saved.position;
                node.location = saved.location;
            }
        }
        for saved in &state.edges {
            if let Some(edge) = self.edges.get_mut(saved.edge) {
                edge.set_state(&self.nodes, saved);
            }
        }
        self.refresh();
    }

    pub fn to_dot(&self) -> String {
        let lines: Vec<String> = self
            .edges
            .iter()
            .filter_map(|edge| edge.dot_line(&self.nodes))
            .collect();
        format!("digraph {{\n    {}\n}}\n", lines.join("\n    "))
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    pub fn update_layout(&mut self, options: LayoutOptions) {
        for _ in self.update_layout_iter(options) {}
    }

    /// Step-by-step layout. Dropping the iterator early leaves the graph
    /// at the last completed checkpoint.
    pub fn update_layout_iter(&mut self, options: LayoutOptions) -> LayoutSteps<'_> {
        LayoutSteps::new(self, options)
    }

    /// Rank everything, materialise waypoints and group the result by rank.
    pub(crate) fn prepare_layout(&mut self) -> (Vec<Rank>, Incidence) {
        let incidence = assign_ranks(&mut self.nodes, &mut self.edges);
        for edge in self.edges.iter_mut() {
            edge.prune_waypoints(&self.nodes);
            for rank in edge.intermediate_ranks(&self.nodes) {
                edge.waypoint_mut(rank);
            }
        }
        adjust_ports(
            &self.nodes,
            &mut self.edges,
            &incidence,
            self.settings.port_separation_ratio,
        );

        let Some(max_rank) = self.nodes.iter().map(|(_, node)| node.rank).max() else {
            return (Vec::new(), incidence);
        };
        let ranks = (0..=max_rank)
            .map(|rank| {
                let on_edges = self
                    .edges
                    .iter()
                    .filter_map(|edge| edge.port_at(&self.nodes, rank))
                    .map(|port| port.key);
                let real = self
                    .nodes
                    .iter()
                    .filter(|(_, node)| node.rank == rank)
                    .map(|(id, _)| NodeKey::Real(id));
                Rank::new(rank, on_edges.chain(real))
            })
            .collect();
        (ranks, incidence)
    }

    /// Stack rank bands along the location axis.
    pub(crate) fn set_rank_locations(&mut self, ranks: &[Rank]) {
        let ratio = self.settings.rank_separation_ratio;
        let mut location = 0.0;
        for rank in ranks {
            location = rank.set_location(self, location);
            // A non-positive ratio adds no spacing beyond the bands.
            if ratio > 0.0 {
                let widest = self
                    .edges
                    .iter()
                    .filter_map(|edge| edge.distance_between(&self.nodes, rank.index, rank.index + 1))
                    .fold(0.0, f32::max);
                location += widest / ratio;
            }
        }
    }

    /// Shift everything so the left-most extent sits at `margin`.
    pub(crate) fn align_left(&mut self, ranks: &[Rank]) {
        let Some(min) = ranks
            .iter()
            .filter_map(|rank| rank.min_position(self))
            .reduce(f32::min)
        else {
            return;
        };
        let shift = self.settings.margin - min;
        for rank in ranks {
            rank.shift_position(self, shift);
        }
    }

    /// Mean position of the ports one rank before (`forwards`) or after
    /// the node, reached through its edges.
    pub(crate) fn pull_target(&self, key: NodeKey, incidence: &Incidence, forwards: bool) -> Option<f32> {
        let node = self.node_by_key(key)?;
        let adjacent = if forwards {
            node.rank.checked_sub(1)?
        } else {
            node.rank + 1
        };
        let positions: Vec<f32> = match key {
            NodeKey::Real(id) => incidence
                .get(&id)
                .into_iter()
                .flatten()
                .filter_map(|edge| self.edges.get(*edge))
                .filter_map(|edge| edge.port_at(&self.nodes, adjacent))
                .map(|port| port.position)
                .collect(),
            NodeKey::Waypoint { edge, .. } => self
                .edges
                .get(edge)
                .and_then(|edge| edge.port_at(&self.nodes, adjacent))
                .map(|port| port.position)
                .into_iter()
                .collect(),
        };
        if positions.is_empty() {
            return None;
        }
        Some(positions.iter().sum::<f32>() / positions.len() as f32)
    }
}

fn label_xy(edge: &Edge, transform: &dyn CoordinateTransform) -> Option<(f32, f32)> {
    edge.label_size?;
    let waypoint = edge.label_waypoint()?;
    Some(transform.transform(waypoint.node.position, waypoint.node.location))
}
