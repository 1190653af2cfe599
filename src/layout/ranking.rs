use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::edge::EdgeStore;
use super::node::NodeStore;
use super::{EdgeId, NodeId};

/// Edges registered on each node, in registration order.
pub(crate) type Incidence = HashMap<NodeId, Vec<EdgeId>>;

/// Longest-path ranking that tolerates cycles.
///
/// Edges are registered one at a time in insertion order. An edge whose
/// head already reaches its tail along registered edges is marked
/// reversed, which keeps the min→max relation acyclic; raising ranks only
/// ever increases them, so propagation terminates.
pub(crate) fn assign_ranks(nodes: &mut NodeStore, edges: &mut EdgeStore) -> Incidence {
    for (_, node) in nodes.iter_mut() {
        node.rank = 0;
    }

    let mut incidence = Incidence::new();
    for id in edges.ids() {
        let Some(edge) = edges.get(id) else {
            continue;
        };
        let (from, to) = (edge.from.node, edge.to.node);
        let reverse = find_to(&incidence, edges, to, from);
        if let Some(edge) = edges.get_mut(id) {
            edge.reverse = reverse;
        }
        propagate(nodes, edges, &incidence, id);
        incidence.entry(from).or_default().push(id);
        incidence.entry(to).or_default().push(id);
    }

    for (id, node) in nodes.iter() {
        debug!(node = %id, name = node.id.as_deref().unwrap_or(""), rank = node.rank, "ranked node");
    }
    for edge in edges.iter() {
        debug!(
            edge = %edge.id,
            from = %edge.from.node,
            to = %edge.to.node,
            reverse = edge.reverse,
            "oriented edge"
        );
    }
    incidence
}

/// Depth-first search from `start` along registered edges in their
/// min→max direction.
pub(crate) fn find_to(incidence: &Incidence, edges: &EdgeStore, start: NodeId, target: NodeId) -> bool {
    let mut stack = vec![start];
    let mut seen = HashSet::new();
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        for id in incidence.get(&node).into_iter().flatten() {
            let Some(edge) = edges.get(*id) else {
                continue;
            };
            if edge.min_rank_node() != node {
                continue;
            }
            let next = edge.max_rank_node();
            if next == target {
                return true;
            }
            stack.push(next);
        }
    }
    false
}

/// Push the later endpoint of `start` past its earlier endpoint and cascade
/// through every registered edge that starts at a raised node.
fn propagate(nodes: &mut NodeStore, edges: &EdgeStore, incidence: &Incidence, start: EdgeId) {
    let mut pending = vec![start];
    while let Some(id) = pending.pop() {
        let Some(edge) = edges.get(id) else {
            continue;
        };
        let (min_node, max_node) = (edge.min_rank_node(), edge.max_rank_node());
        let Some(floor) = nodes.get(min_node).map(|node| node.rank + edge.rank_gap()) else {
            continue;
        };
        let Some(max) = nodes.get_mut(max_node) else {
            continue;
        };
        if max.rank >= floor {
            continue;
        }
        max.rank = floor;
        for next in incidence.get(&max_node).into_iter().flatten() {
            if edges.get(*next).is_some_and(|e| e.min_rank_node() == max_node) {
                pending.push(*next);
            }
        }
    }
}

/// Recompute automatic port offsets and size the waypoints of labelled
/// edges. Safe to run again after any re-ranking.
pub(crate) fn adjust_ports(
    nodes: &NodeStore,
    edges: &mut EdgeStore,
    incidence: &Incidence,
    separation_ratio: f32,
) {
    for id in edges.ids() {
        let Some(edge) = edges.get(id) else {
            continue;
        };
        let reverse = edge.reverse;
        let from_split = needs_separation(edges, incidence, edge.from.node, reverse);
        let to_split = needs_separation(edges, incidence, edge.to.node, !reverse);
        let intermediate = edge.intermediate_ranks(nodes);

        let Some(edge) = edges.get_mut(id) else {
            continue;
        };
        if let Some(node) = nodes.get(edge.from.node) {
            edge.from.adjust(node, reverse, from_split, separation_ratio);
        }
        if let Some(node) = nodes.get(edge.to.node) {
            edge.to.adjust(node, !reverse, to_split, separation_ratio);
        }

        match edge.label_size {
            Some(label_size) if !intermediate.is_empty() => {
                let label_rank = intermediate.start;
                edge.label_rank = Some(label_rank);
                for rank in intermediate {
                    let waypoint = edge.waypoint_mut(rank);
                    waypoint.node.size = if rank == label_rank { label_size } else { 0.0 };
                    waypoint.offset_position = -waypoint.node.size / 2.0;
                }
            }
            _ => edge.label_rank = None,
        }
    }
}

/// True when `node` mixes reversed and forward edges on the side
/// selected by `is_higher_rank`.
fn needs_separation(
    edges: &EdgeStore,
    incidence: &Incidence,
    node: NodeId,
    is_higher_rank: bool,
) -> bool {
    let mut forward = false;
    let mut reversed = false;
    for edge in incidence
        .get(&node)
        .into_iter()
        .flatten()
        .filter_map(|id| edges.get(*id))
    {
        let extreme = if is_higher_rank {
            edge.max_rank_node()
        } else {
            edge.min_rank_node()
        };
        if extreme != node {
            continue;
        }
        if edge.reverse {
            reversed = true;
        } else {
            forward = true;
        }
    }
    forward && reversed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::node::Node;
    use crate::layout::port::{Port, PortSide};

    fn build(count: usize, links: &[(usize, usize, Option<f32>)]) -> (NodeStore, EdgeStore, Vec<NodeId>) {
        let mut nodes = NodeStore::default();
        let ids: Vec<NodeId> = (0..count)
            .map(|idx| nodes.insert(Node::new(10.0, 10.0, Some(format!("n{idx}")))))
            .collect();
        let mut edges = EdgeStore::default();
        for (from, to, label) in links {
            edges.insert(
                Port::auto(ids[*from], PortSide::Outgoing),
                Port::auto(ids[*to], PortSide::Incoming),
                *label,
            );
        }
        (nodes, edges, ids)
    }

    fn rank(nodes: &NodeStore, id: NodeId) -> usize {
        nodes.get(id).map(|n| n.rank).unwrap_or(usize::MAX)
    }

    #[test]
    fn chain_gets_longest_path_ranks() {
        let (mut nodes, mut edges, ids) = build(4, &[(0, 1, None), (1, 2, None), (0, 2, None), (2, 3, None)]);
        assign_ranks(&mut nodes, &mut edges);
        let ranks: Vec<usize> = ids.iter().map(|id| rank(&nodes, *id)).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn late_edges_cascade_through_registered_ones() {
        // b -> c is registered before a -> b raises b.
        let (mut nodes, mut edges, ids) = build(3, &[(1, 2, None), (0, 1, None)]);
        assign_ranks(&mut nodes, &mut edges);
        assert_eq!(rank(&nodes, ids[0]), 0);
        assert_eq!(rank(&nodes, ids[1]), 1);
        assert_eq!(rank(&nodes, ids[2]), 2);
    }

    #[test]
    fn cycle_reverses_exactly_one_edge() {
        let (mut nodes, mut edges, ids) = build(3, &[(0, 1, None), (1, 2, None), (2, 0, None)]);
        assign_ranks(&mut nodes, &mut edges);
        let reversed: Vec<bool> = edges.iter().map(|e| e.reverse).collect();
        assert_eq!(reversed, vec![false, false, true]);
        assert_eq!(rank(&nodes, ids[2]), 2);
        assert_eq!(rank(&nodes, ids[0]), 0);
    }

    #[test]
    fn labels_reserve_an_extra_rank() {
        let (mut nodes, mut edges, ids) = build(2, &[(0, 1, Some(10.0))]);
        assign_ranks(&mut nodes, &mut edges);
        assert_eq!(rank(&nodes, ids[1]), 2);
    }

    #[test]
    fn find_to_follows_min_to_max_only() {
        let (mut nodes, mut edges, ids) = build(3, &[(0, 1, None), (1, 2, None)]);
        let incidence = assign_ranks(&mut nodes, &mut edges);
        assert!(find_to(&incidence, &edges, ids[0], ids[2]));
        assert!(!find_to(&incidence, &edges, ids[2], ids[0]));
    }

    #[test]
    fn mixed_orientation_splits_ports() {
        // a -> b, b -> a: the second edge is reversed, so a and b each carry
        // one forward and one reversed edge on the same side.
        let (mut nodes, mut edges, _) = build(2, &[(0, 1, None), (1, 0, None)]);
        let incidence = assign_ranks(&mut nodes, &mut edges);
        adjust_ports(&nodes, &mut edges, &incidence, 0.25);
        let offsets: Vec<(f32, f32)> = edges
            .iter()
            .map(|e| (e.from.offset_position, e.to.offset_position))
            .collect();
        assert_eq!(offsets, vec![(2.5, 2.5), (-2.5, -2.5)]);
    }

    #[test]
    fn label_waypoint_gets_label_size() {
        let (mut nodes, mut edges, _) = build(2, &[(0, 1, Some(12.0))]);
        let incidence = assign_ranks(&mut nodes, &mut edges);
        adjust_ports(&nodes, &mut edges, &incidence, 0.25);
        let edge = edges.iter().next().unwrap();
        let label = edge.label_waypoint().unwrap();
        assert_eq!(label.node.size, 12.0);
        assert_eq!(label.offset_position, -6.0);
    }
}
