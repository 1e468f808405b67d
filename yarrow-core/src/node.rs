//! Node tree produced by the composer.
//!
//! Nodes live in a flat arena addressed by [`NodeId`]; an alias is the same
//! id appearing twice, so shared and cyclic structures need no ownership
//! tricks and identity survives into construction.

use yarrow_common::{CommentSlots, Marker, ScalarStyle};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Scalar {
        value: String,
        style: ScalarStyle,
    },
    Sequence {
        items: Vec<NodeId>,
        flow: bool,
    },
    Mapping {
        pairs: Vec<(NodeId, NodeId)>,
        flow: bool,
    },
}

impl NodeKind {
    /// The node kind's name as error messages spell it.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Scalar { .. } => "scalar",
            NodeKind::Sequence { .. } => "sequence",
            NodeKind::Mapping { .. } => "mapping",
        }
    }
}

/// A composed node: resolved tag, content, source span, and the comments
/// that arrived with its events.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub tag: String,
    pub kind: NodeKind,
    pub start: Marker,
    pub end: Marker,
    pub anchor: Option<String>,
    pub comments: CommentSlots,
}

#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> NodeArena {
        NodeArena::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}
