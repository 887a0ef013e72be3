//! Per-file node arena.
//!
//! Each parsed document owns one [`Ast`]. Nodes never move once allocated,
//! so a `(file id, NodeId)` pair stays valid for as long as the owning
//! [`Program`](crate::Program) lives. Registries and the generator refer to
//! nodes exclusively through [`NodeRef`].

use super::node::Node;
use crate::foundation::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside one file's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Program-wide node reference: owning file plus arena index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub file: u16,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(file: u16, node: NodeId) -> Self {
        Self { file, node }
    }

    /// A sibling reference in the same file.
    pub fn with_node(self, node: NodeId) -> Self {
        Self { file: self.file, node }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file, self.node.0)
    }
}

/// Arena holding every node of one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ast {
    file_id: u16,
    nodes: Vec<Node>,
    spans: Vec<Span>,
    /// Top-level statements in source order
    roots: Vec<NodeId>,
}

impl Ast {
    pub fn new(file_id: u16) -> Self {
        Self {
            file_id,
            nodes: Vec::new(),
            spans: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn file_id(&self) -> u16 {
        self.file_id
    }

    /// Allocate a node and return its index.
    pub fn alloc(&mut self, node: Node, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.spans.push(span);
        id
    }

    /// Append a top-level statement.
    pub fn push_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Mutable access, used by the parser to finish nodes allocated early.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.spans
            .get(id.0 as usize)
            .copied()
            .unwrap_or_else(|| Span::zero(self.file_id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
