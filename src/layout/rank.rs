use std::collections::HashSet;

use super::Graph;
use super::node::NodeKey;
use super::ranking::Incidence;

/// Everything that occupies one layer: real nodes plus edge waypoints.
#[derive(Debug, Clone, Default)]
pub struct Rank {
    pub(crate) index: usize,
    pub(crate) nodes: Vec<NodeKey>,
}

impl Rank {
    /// Keeps the first occurrence of every key.
    pub(crate) fn new(index: usize, keys: impl IntoIterator<Item = NodeKey>) -> Self {
        let mut seen = HashSet::new();
        let nodes = keys.into_iter().filter(|key| seen.insert(*key)).collect();
        Self { index, nodes }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn sort(&mut self, graph: &Graph) {
        let position = |key: &NodeKey| graph.node_by_key(*key).map_or(0.0, |node| node.position);
        self.nodes.sort_by(|a, b| position(a).total_cmp(&position(b)));
    }

    /// One relaxation step: pull every member toward its neighbours on the
    /// previous (`forwards`) or next rank, re-sort, then clear overlaps.
    pub(crate) fn detangle(
        &mut self,
        graph: &mut Graph,
        incidence: &Incidence,
        forwards: bool,
        amplitude: f32,
    ) {
        let targets: Vec<Option<f32>> = self
            .nodes
            .iter()
            .map(|key| graph.pull_target(*key, incidence, forwards))
            .collect();
        for (key, target) in self.nodes.iter().zip(targets) {
            if let Some(node) = graph.node_by_key_mut(*key) {
                node.pull_toward(target, amplitude);
            }
        }
        self.sort(graph);
        self.resolve_overlaps(graph);
    }

    /// Left-to-right sweep moves each node half its overlap to the right,
    /// right-to-left sweep then moves the left neighbour by whatever is left.
    fn resolve_overlaps(&self, graph: &mut Graph) {
        let gap = graph.settings().node_gap;
        for idx in 1..self.nodes.len() {
            let overlap = overlap(graph, self.nodes[idx - 1], self.nodes[idx], gap);
            if overlap > 0.0
                && let Some(node) = graph.node_by_key_mut(self.nodes[idx])
            {
                node.position += overlap / 2.0;
            }
        }
        for idx in (1..self.nodes.len()).rev() {
            let overlap = overlap(graph, self.nodes[idx - 1], self.nodes[idx], gap);
            if overlap > 0.0
                && let Some(node) = graph.node_by_key_mut(self.nodes[idx - 1])
            {
                node.position -= overlap;
            }
        }
    }

    pub(crate) fn min_position(&self, graph: &Graph) -> Option<f32> {
        self.nodes
            .iter()
            .filter_map(|key| graph.node_by_key(*key))
            .map(|node| node.min_position())
            .reduce(f32::min)
    }

    pub(crate) fn shift_position(&self, graph: &mut Graph, shift: f32) {
        for key in &self.nodes {
            if let Some(node) = graph.node_by_key_mut(*key) {
                node.position += shift;
            }
        }
    }

    /// Place this rank's band at `location` and return where the next band
    /// may start.
    pub(crate) fn set_location(&self, graph: &mut Graph, location: f32) -> f32 {
        let rank_margin = graph.settings().rank_margin;
        let tallest = self
            .nodes
            .iter()
            .filter_map(|key| graph.node_by_key(*key))
            .map(|node| node.depth)
            .fold(0.0, f32::max);
        let depth = tallest + rank_margin * 2.0;
        let center = location + depth / 2.0;
        for key in &self.nodes {
            if let Some(node) = graph.node_by_key_mut(*key) {
                node.set_location(depth, center);
            }
        }
        center + depth / 2.0
    }
}

fn overlap(graph: &Graph, left: NodeKey, right: NodeKey, gap: f32) -> f32 {
    match (graph.node_by_key(left), graph.node_by_key(right)) {
        (Some(left), Some(right)) => left.max_position() + gap - right.min_position(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutSettings;
    use crate::layout::transform::Direction;
    use crate::layout::NodeId;

    fn graph_with(sizes: &[(f32, f32)]) -> (Graph, Vec<NodeId>) {
        let mut graph = Graph::new(Direction::TopDown, LayoutSettings::default());
        let ids = sizes
            .iter()
            .enumerate()
            .map(|(idx, (size, depth))| graph.add_node(*size, *depth, format!("n{idx}")))
            .collect();
        (graph, ids)
    }

    fn position(graph: &Graph, id: NodeId) -> f32 {
        graph.node(id).map(|n| n.position).unwrap_or(f32::NAN)
    }

    #[test]
    fn deduplicates_in_first_seen_order() {
        let a = NodeKey::Real(NodeId(1));
        let b = NodeKey::Real(NodeId(2));
        let rank = Rank::new(3, [b, a, b]);
        assert_eq!(rank.nodes(), &[b, a]);
        assert_eq!(rank.index(), 3);
        assert_eq!(rank.len(), 2);
        assert!(!rank.is_empty());
        assert!(Rank::default().is_empty());
    }

    #[test]
    fn detangle_separates_stacked_nodes() {
        let (mut graph, ids) = graph_with(&[(10.0, 5.0), (20.0, 5.0), (10.0, 5.0)]);
        let mut rank = Rank::new(0, ids.iter().map(|id| NodeKey::Real(*id)));
        rank.detangle(&mut graph, &Incidence::new(), true, 1.0);

        let gap = graph.settings().node_gap;
        let mut sorted: Vec<(f32, f32)> = ids
            .iter()
            .filter_map(|id| graph.node(*id))
            .map(|n| (n.position, n.size))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        for pair in sorted.windows(2) {
            let needed = (pair[0].1 + pair[1].1) / 2.0 + gap;
            assert!(pair[1].0 - pair[0].0 >= needed - 1e-4);
        }
    }

    #[test]
    fn band_is_sized_by_tallest_member() {
        let (mut graph, ids) = graph_with(&[(10.0, 12.0), (10.0, 30.0)]);
        let rank = Rank::new(0, ids.iter().map(|id| NodeKey::Real(*id)));
        let next = rank.set_location(&mut graph, 100.0);
        // 30 deep plus the default 8 margin on both sides.
        assert_eq!(next, 146.0);
        let node = graph.node(ids[0]).unwrap();
        assert_eq!(node.location, 123.0);
        assert_eq!(node.rank_depth, 46.0);
    }

    #[test]
    fn min_position_and_shift() {
        let (mut graph, ids) = graph_with(&[(10.0, 5.0), (30.0, 5.0)]);
        let rank = Rank::new(0, ids.iter().map(|id| NodeKey::Real(*id)));
        rank.shift_position(&mut graph, 40.0);
        assert_eq!(position(&graph, ids[0]), 40.0);
        assert_eq!(rank.min_position(&graph), Some(25.0));
    }
}
