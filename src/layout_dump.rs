use crate::ir::Diagram;
use crate::layout::{Direction, LayoutState, NodeId};
use crate::render::node_rect;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Laid-out geometry in output coordinates, plus the raw engine snapshot.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub direction: Direction,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub state: LayoutState,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub rank: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub reversed: bool,
    pub path: String,
    pub label: Option<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_diagram(diagram: &Diagram) -> Self {
        let graph = &diagram.graph;
        let name = |id: NodeId| {
            graph
                .node(id)
                .and_then(|node| node.id.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let nodes = graph
            .nodes()
            .filter_map(|(id, node)| {
                let (x, y, width, height) = node_rect(graph, id)?;
                Some(NodeDump {
                    id: name(id),
                    rank: node.rank,
                    x,
                    y,
                    width,
                    height,
                })
            })
            .collect();

        let edges = graph
            .edges()
            .map(|edge| EdgeDump {
                from: name(edge.from.node),
                to: name(edge.to.node),
                reversed: edge.is_reversed(),
                path: graph
                    .route(edge.id())
                    .map(|route| route.to_string())
                    .unwrap_or_default(),
                label: graph.label_xy(edge.id()).map(|(x, y)| [x, y]),
            })
            .collect();

        LayoutDump {
            direction: diagram.direction,
            nodes,
            edges,
            state: graph.state(),
        }
    }
}

/// Write the dump to `path`, or stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, diagram: &Diagram) -> anyhow::Result<()> {
    let dump = LayoutDump::from_diagram(diagram);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ir::parse_graph_spec;
    use crate::layout::LayoutOptions;

    #[test]
    fn dump_names_nodes_and_serialises() {
        let mut diagram = parse_graph_spec(r#"{ edges: [{ from: "a", to: "b" }, { from: "b", to: "a" }] }"#)
            .unwrap()
            .build(&Config::default())
            .unwrap();
        diagram.graph.update_layout(LayoutOptions::default());
        let dump = LayoutDump::from_diagram(&diagram);
        assert_eq!(dump.nodes.len(), 2);
        assert_eq!(dump.edges[1].from, "b");
        assert!(dump.edges[1].reversed);
        assert!(dump.edges[0].path.starts_with("M "));

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["direction"], "TopDown");
        assert_eq!(json["state"]["nodes"].as_array().map(Vec::len), Some(2));
    }
}
