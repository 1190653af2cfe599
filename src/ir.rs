use crate::config::{Config, SizingConfig};
use crate::layout::{Direction, EdgeId, Graph, NodeId};
use crate::text_metrics;
use crate::theme::Theme;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Topology document read by the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSpec {
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub size: Option<f32>,
    #[serde(default)]
    pub depth: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub from_port: Option<String>,
    #[serde(default)]
    pub to_port: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub label_size: Option<f32>,
}

/// An engine graph plus the text the renderer needs to draw it.
#[derive(Debug)]
pub struct Diagram {
    pub direction: Direction,
    pub graph: Graph,
    pub ids: BTreeMap<String, NodeId>,
    pub node_labels: BTreeMap<NodeId, String>,
    pub edge_labels: BTreeMap<EdgeId, String>,
}

pub fn parse_graph_spec(input: &str) -> Result<GraphSpec> {
    json5::from_str(input).context("invalid topology document")
}

impl GraphSpec {
    pub fn direction(&self) -> Result<Direction> {
        match self.direction.as_deref() {
            None => Ok(Direction::default()),
            Some(token) => Direction::from_token(token)
                .with_context(|| format!("unknown direction `{token}`")),
        }
    }

    pub fn build(&self, config: &Config) -> Result<Diagram> {
        let direction = self.direction()?;
        let measure = Measure {
            direction,
            theme: &config.theme,
            sizing: &config.sizing,
        };
        let mut diagram = Diagram {
            direction,
            graph: Graph::new(direction, config.layout),
            ids: BTreeMap::new(),
            node_labels: BTreeMap::new(),
            edge_labels: BTreeMap::new(),
        };

        for node in &self.nodes {
            if diagram.ids.contains_key(&node.id) {
                continue;
            }
            let label = node.label.clone().unwrap_or_else(|| node.id.clone());
            let (size, depth) = measure.node(&label);
            let id = diagram.graph.add_node(
                node.size.unwrap_or(size),
                node.depth.unwrap_or(depth),
                node.id.clone(),
            );
            diagram.ids.insert(node.id.clone(), id);
            diagram.node_labels.insert(id, label);
        }

        for edge in &self.edges {
            let from = diagram.ensure_node(&edge.from, &measure);
            let to = diagram.ensure_node(&edge.to, &measure);
            let mut from_port = diagram.graph.auto_port(from, false);
            if let Some(name) = &edge.from_port {
                from_port = from_port.named(name.clone());
            }
            let mut to_port = diagram.graph.auto_port(to, true);
            if let Some(name) = &edge.to_port {
                to_port = to_port.named(name.clone());
            }
            let label_size = edge
                .label_size
                .or_else(|| edge.label.as_deref().map(|label| measure.edge_label(label)));
            let id = diagram
                .graph
                .add_edge(from_port, to_port, label_size)
                .with_context(|| format!("edge {} -> {}", edge.from, edge.to))?;
            if let Some(label) = &edge.label {
                diagram.edge_labels.insert(id, label.clone());
            }
        }

        Ok(diagram)
    }
}

impl Diagram {
    fn ensure_node(&mut self, name: &str, measure: &Measure<'_>) -> NodeId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let (size, depth) = measure.node(name);
        let id = self.graph.add_node(size, depth, name);
        self.ids.insert(name.to_string(), id);
        self.node_labels.insert(id, name.to_string());
        id
    }
}

/// Label measurement mapped onto the engine's axes.
struct Measure<'a> {
    direction: Direction,
    theme: &'a Theme,
    sizing: &'a SizingConfig,
}

impl Measure<'_> {
    fn extent(&self, text: &str) -> (f32, f32) {
        text_metrics::label_extent(
            text,
            self.theme.font_size,
            &self.theme.font_family,
            self.sizing.label_line_height,
        )
    }

    /// (size, depth) of a node box.
    fn node(&self, label: &str) -> (f32, f32) {
        let (width, height) = self.extent(label);
        let width = width + self.sizing.node_padding_x;
        let height = height + self.sizing.node_padding_y;
        match self.direction {
            Direction::TopDown => (width, height),
            Direction::LeftRight => (height, width),
        }
    }

    fn edge_label(&self, label: &str) -> f32 {
        let (width, height) = self.extent(label);
        let across = match self.direction {
            Direction::TopDown => width,
            Direction::LeftRight => height,
        };
        across + self.sizing.edge_label_padding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_json5_with_comments_and_bare_keys() {
        let spec = parse_graph_spec(
            r#"{
                // left to right
                direction: "LR",
                nodes: [{ id: "a", size: 40, depth: 20 }],
                edges: [{ from: "a", to: "b", toPort: "f1", label: "go" }],
            }"#,
        )
        .unwrap();
        assert_eq!(spec.direction().unwrap(), Direction::LeftRight);
        assert_eq!(spec.edges[0].to_port.as_deref(), Some("f1"));
    }

    #[test]
    fn edges_create_missing_nodes() {
        let spec = parse_graph_spec(r#"{ edges: [{ from: "a", to: "b" }, { from: "b", to: "c" }] }"#)
            .unwrap();
        let diagram = spec.build(&Config::default()).unwrap();
        assert_eq!(diagram.graph.node_count(), 3);
        assert_eq!(diagram.graph.edge_count(), 2);
        assert_eq!(diagram.graph.to_dot(), "digraph {\n    a -> b;\n    b -> c;\n}\n");
    }

    #[test]
    fn explicit_sizes_win_over_measurement() {
        let spec = parse_graph_spec(r#"{ nodes: [{ id: "a", size: 77, depth: 33 }] }"#).unwrap();
        let diagram = spec.build(&Config::default()).unwrap();
        let node = diagram.graph.node(diagram.ids["a"]).unwrap();
        assert_eq!((node.size, node.depth), (77.0, 33.0));
    }

    #[test]
    fn measured_edge_labels_get_a_size() {
        let spec =
            parse_graph_spec(r#"{ edges: [{ from: "a", to: "b", label: "yes" }] }"#).unwrap();
        let diagram = spec.build(&Config::default()).unwrap();
        let edge = diagram.graph.edges().next().unwrap();
        assert!(edge.label_size.unwrap() > Config::default().sizing.edge_label_padding);
        assert_eq!(diagram.edge_labels[&edge.id()], "yes");
    }

    #[test]
    fn self_edges_are_rejected() {
        let spec = parse_graph_spec(r#"{ edges: [{ from: "a", to: "a" }] }"#).unwrap();
        assert!(spec.build(&Config::default()).is_err());
    }

    #[test]
    fn unknown_direction_is_an_error() {
        let spec = parse_graph_spec(r#"{ direction: "XY" }"#).unwrap();
        assert!(spec.direction().is_err());
    }
}
