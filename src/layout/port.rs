use super::node::{Node, NodeId, NodeKey};

/// Which bundle an automatically placed port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSide {
    Incoming,
    Outgoing,
}

/// Attachment point on a node. Absolute coordinates are the node's
/// coordinates plus the stored offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub node: NodeId,
    pub offset_position: f32,
    pub offset_location: f32,
    /// Sub-port name, e.g. a record field.
    pub id: Option<String>,
    /// `Some` when offsets are recomputed from incident-edge bundling.
    pub auto: Option<PortSide>,
}

impl Port {
    /// Port with caller-fixed offsets.
    pub fn new(node: NodeId, offset_position: f32, offset_location: f32) -> Self {
        Self {
            node,
            offset_position,
            offset_location,
            id: None,
            auto: None,
        }
    }

    /// Port centred on `node` whose offsets follow the edges around it.
    pub fn auto(node: NodeId, side: PortSide) -> Self {
        Self {
            auto: Some(side),
            ..Self::new(node, 0.0, 0.0)
        }
    }

    pub fn named(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn position(&self, node: &Node) -> f32 {
        node.position + self.offset_position
    }

    pub fn location(&self, node: &Node) -> f32 {
        node.location + self.offset_location
    }

    /// Recompute automatic offsets. `is_higher_rank` tells whether this
    /// port sits on the later-ranked end of its edge, `needs_separation`
    /// whether the node mixes reversed and forward edges on that side.
    pub(crate) fn adjust(
        &mut self,
        node: &Node,
        is_higher_rank: bool,
        needs_separation: bool,
        separation_ratio: f32,
    ) {
        let Some(side) = self.auto else {
            return;
        };
        let incoming = side == PortSide::Incoming;
        let sign = match (needs_separation, incoming == is_higher_rank) {
            (false, _) => 0.0,
            (true, true) => 1.0,
            (true, false) => -1.0,
        };
        self.offset_position = sign * node.size * separation_ratio;
        let toward = if is_higher_rank { -1.0 } else { 1.0 };
        self.offset_location = toward * node.depth / 2.0;
    }

    pub(crate) fn resolve(&self, node: &Node) -> PortPoint {
        PortPoint {
            key: NodeKey::Real(self.node),
            rank: node.rank,
            position: self.position(node),
            location: self.location(node),
            before_rank: node.before_rank(),
            after_rank: node.after_rank(),
        }
    }

    /// `node` or `node:port` as used by the text export.
    pub fn dot_id(&self, node: &Node) -> String {
        let base = node.id.clone().unwrap_or_else(|| self.node.to_string());
        match &self.id {
            Some(port) => format!("{base}:{port}"),
            None => base,
        }
    }
}

/// A port resolved against its node at one moment of the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortPoint {
    pub key: NodeKey,
    pub rank: usize,
    pub position: f32,
    pub location: f32,
    pub before_rank: f32,
    pub after_rank: f32,
}
