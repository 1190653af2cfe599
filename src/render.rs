use crate::config::{RenderConfig, SizingConfig};
use crate::ir::Diagram;
use crate::layout::{Graph, NodeId};
use crate::text_metrics;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Output-space rectangle `(x, y, width, height)` of a node.
pub fn node_rect(graph: &Graph, id: NodeId) -> Option<(f32, f32, f32, f32)> {
    let node = graph.node(id)?;
    let transform = graph.transform();
    let (x0, y0) = transform.transform(
        node.position - node.size / 2.0,
        node.location - node.depth / 2.0,
    );
    let (x1, y1) = transform.transform(
        node.position + node.size / 2.0,
        node.location + node.depth / 2.0,
    );
    Some((x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs()))
}

pub fn render_svg(diagram: &Diagram, theme: &Theme, sizing: &SizingConfig) -> String {
    let graph = &diagram.graph;
    let margin = graph.settings().margin;

    let mut body = String::new();
    let mut extent = (0.0f32, 0.0f32);
    let mut grow = |x: f32, y: f32| {
        extent.0 = extent.0.max(x);
        extent.1 = extent.1.max(y);
    };

    for edge in graph.edges() {
        let Some(route) = graph.route(edge.id()) else {
            continue;
        };
        if route.is_empty() {
            continue;
        }
        for cmd in route.commands() {
            let (x, y) = cmd.end();
            grow(x, y);
        }
        body.push_str(&format!(
            "<path d=\"{route}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\" marker-end=\"url(#arrow)\"/>",
            theme.line_color
        ));

        let label = diagram.edge_labels.get(&edge.id());
        if let (Some(label), Some((x, y))) = (label, graph.label_xy(edge.id())) {
            let (w, h) = text_metrics::label_extent(
                label,
                theme.font_size,
                &theme.font_family,
                sizing.label_line_height,
            );
            let rect_x = x - w / 2.0 - 6.0;
            let rect_y = y - h / 2.0 - 4.0;
            let rect_w = w + 12.0;
            let rect_h = h + 8.0;
            grow(rect_x + rect_w, rect_y + rect_h);
            body.push_str(&format!(
                "<rect x=\"{rect_x:.2}\" y=\"{rect_y:.2}\" width=\"{rect_w:.2}\" height=\"{rect_h:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
                theme.edge_label_background, theme.primary_border_color
            ));
            body.push_str(&text_block_svg(x, y, label, theme, sizing));
        }
    }

    for (id, node) in graph.nodes() {
        let Some((x, y, w, h)) = node_rect(graph, id) else {
            continue;
        };
        grow(x + w, y + h);
        body.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"5\" ry=\"5\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
            theme.primary_color, theme.primary_border_color
        ));
        let label = diagram
            .node_labels
            .get(&id)
            .map(String::as_str)
            .or(node.id.as_deref())
            .unwrap_or_default();
        body.push_str(&text_block_svg(x + w / 2.0, y + h / 2.0, label, theme, sizing));
    }

    let width = extent.0 + margin;
    let height = extent.1 + margin;
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str("<defs>");
    svg.push_str(&arrow_marker(graph.settings().arrow_length, &theme.line_color));
    svg.push_str("</defs>");
    svg.push_str(&body);
    svg.push_str("</svg>");
    svg
}

/// Arrowhead spanning `arrow_length` on either side of the route end, so
/// the tip lands on the head port the route stops short of.
fn arrow_marker(arrow_length: f32, fill: &str) -> String {
    let extent = arrow_length * 2.0;
    format!(
        "<marker id=\"arrow\" viewBox=\"0 0 6 6\" refX=\"3\" refY=\"3\" markerUnits=\"userSpaceOnUse\" markerWidth=\"{extent:.2}\" markerHeight=\"{extent:.2}\" orient=\"auto\"><path d=\"M 0 0 L 6 3 L 0 6 z\" fill=\"{fill}\"/></marker>"
    )
}

fn text_block_svg(x: f32, y: f32, text: &str, theme: &Theme, sizing: &SizingConfig) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let line_step = theme.font_size * sizing.label_line_height;
    let total_height = lines.len() as f32 * line_step;
    let start_y = y - total_height / 2.0 + theme.font_size;

    let mut out = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.primary_text_color
    );
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_step };
        out.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    out.push_str("</text>");
    out
}

/// Write SVG or DOT text to `output`, or stdout when no path is given.
pub fn write_output_text(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "sans-serif".to_string());
    let fallback = usvg::Size::from_wh(800.0, 600.0)
        .ok_or_else(|| anyhow::anyhow!("invalid fallback canvas size"))?;
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height).unwrap_or(fallback);
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;
    pixmap.fill(parse_hex_color(&render_cfg.background));

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

#[cfg(feature = "png")]
fn parse_hex_color(value: &str) -> resvg::tiny_skia::Color {
    let hex = value.trim().trim_start_matches('#');
    let channel = |idx: usize| {
        hex.get(idx..idx + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or(255)
    };
    if hex.len() == 6 {
        resvg::tiny_skia::Color::from_rgba8(channel(0), channel(2), channel(4), 255)
    } else {
        resvg::tiny_skia::Color::WHITE
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ir::parse_graph_spec;
    use crate::layout::LayoutOptions;

    fn laid_out(input: &str) -> Diagram {
        let mut diagram = parse_graph_spec(input)
            .unwrap()
            .build(&Config::default())
            .unwrap();
        diagram.graph.update_layout(LayoutOptions::default());
        diagram
    }

    #[test]
    fn render_svg_basic() {
        let diagram = laid_out(
            r#"{ nodes: [{ id: "A", label: "Alpha" }], edges: [{ from: "A", to: "B", label: "go & back" }] }"#,
        );
        let config = Config::default();
        let svg = render_svg(&diagram, &config.theme, &config.sizing);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Alpha"));
        assert!(svg.contains("go &amp; back"));
        assert_eq!(svg.matches("marker-end=\"url(#arrow)\"").count(), 1);
    }

    #[test]
    fn node_rect_follows_direction() {
        let diagram = laid_out(r#"{ direction: "LR", nodes: [{ id: "a", size: 20, depth: 60 }] }"#);
        let id = diagram.ids["a"];
        let (_, _, w, h) = node_rect(&diagram.graph, id).unwrap();
        assert_eq!((w, h), (60.0, 20.0));
    }

    #[test]
    fn arrow_tip_reaches_the_head_port() {
        let marker = arrow_marker(3.0, "#333");
        assert!(marker.contains("markerUnits=\"userSpaceOnUse\""));
        assert!(marker.contains("markerWidth=\"6.00\""));
        assert!(marker.contains("refX=\"3\""));
        // Tip at x = 6 in a 6-unit box scaled to 6 user units: 3 past refX.
        assert!(marker.contains("L 6 3"));

        let mut config = Config::default();
        config.layout.arrow_length = 5.0;
        let mut diagram = parse_graph_spec(r#"{ edges: [{ from: "a", to: "b" }] }"#)
            .unwrap()
            .build(&config)
            .unwrap();
        diagram.graph.update_layout(LayoutOptions::default());
        let svg = render_svg(&diagram, &config.theme, &config.sizing);
        assert!(svg.contains("markerWidth=\"10.00\""));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("<a>"), "&lt;a&gt;");
    }
}
