use std::fmt;

use super::edge::Edge;
use super::node::NodeStore;
use super::port::PortPoint;
use super::transform::CoordinateTransform;

// ── Path tokens ──────────────────────────────────────────────────────

/// One token of an SVG-style path, already in output coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    Move(f32, f32),
    Line(f32, f32),
    Cubic {
        c1: (f32, f32),
        c2: (f32, f32),
        end: (f32, f32),
    },
}

impl PathCommand {
    pub fn end(&self) -> (f32, f32) {
        match *self {
            PathCommand::Move(x, y) | PathCommand::Line(x, y) => (x, y),
            PathCommand::Cubic { end, .. } => end,
        }
    }
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCommand::Move(x, y) => write!(f, "M {x:.2} {y:.2}"),
            PathCommand::Line(x, y) => write!(f, "L {x:.2} {y:.2}"),
            PathCommand::Cubic { c1, c2, end } => write!(
                f,
                "C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                c1.0, c1.1, c2.0, c2.1, end.0, end.1
            ),
        }
    }
}

/// Multi-segment edge route. `Display` renders the path data string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    commands: Vec<PathCommand>,
}

impl Route {
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn start(&self) -> Option<(f32, f32)> {
        self.commands.first().map(PathCommand::end)
    }

    pub fn end(&self) -> Option<(f32, f32)> {
        self.commands.last().map(PathCommand::end)
    }

    pub fn curve_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, PathCommand::Cubic { .. }))
            .count()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, cmd) in self.commands.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

// ── Spline synthesis ─────────────────────────────────────────────────

/// Route `edge` through its ports rank by rank. Empty until the edge spans
/// at least one rank gap.
pub(crate) fn edge_route(
    edge: &Edge,
    nodes: &NodeStore,
    transform: &dyn CoordinateTransform,
    arrow_length: f32,
) -> Route {
    let Some((min, max)) = edge.span(nodes) else {
        return Route::default();
    };
    let mut hops = Vec::with_capacity(max.saturating_sub(min));
    for rank in min..max {
        let (Some(from), Some(to)) = (edge.port_at(nodes, rank), edge.port_at(nodes, rank + 1))
        else {
            return Route::default();
        };
        hops.push((from, to));
    }
    if edge.is_reversed() {
        hops = hops.into_iter().rev().map(|(from, to)| (to, from)).collect();
    }

    let last = hops.len().saturating_sub(1);
    let commands = hops
        .iter()
        .enumerate()
        .flat_map(|(idx, (from, to))| {
            spline(from, to, transform, arrow_length, idx == 0, idx == last)
        })
        .collect();
    Route { commands }
}

/// One rank hop: out of `from` to its band boundary, a cubic across the
/// gap with both control points on the gap's mid line, then into `to`.
fn spline(
    from: &PortPoint,
    to: &PortPoint,
    transform: &dyn CoordinateTransform,
    arrow_length: f32,
    is_first: bool,
    is_last: bool,
) -> [PathCommand; 4] {
    let downward = from.rank < to.rank;
    let from_boundary = if downward { from.after_rank } else { from.before_rank };
    let to_boundary = if downward { to.before_rank } else { to.after_rank };
    let middle = (from_boundary + to_boundary) / 2.0;
    let trim = if is_last { arrow_length } else { 0.0 };
    let arrow_side = if downward { -1.0 } else { 1.0 };

    let (sx, sy) = transform.transform(from.position, from.location);
    let (bx, by) = transform.transform(from.position, from_boundary);
    let c1 = transform.transform(from.position, middle);
    let c2 = transform.transform(to.position, middle);
    let end = transform.transform(to.position, to_boundary);
    let (tx, ty) = transform.transform(to.position, to.location + arrow_side * trim);

    [
        if is_first {
            PathCommand::Move(sx, sy)
        } else {
            PathCommand::Line(sx, sy)
        },
        PathCommand::Line(bx, by),
        PathCommand::Cubic { c1, c2, end },
        PathCommand::Line(tx, ty),
    ]
}
