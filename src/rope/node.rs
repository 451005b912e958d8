use super::summary::{Chunk, Summary};

/// Handle of a node committed to the shared pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Handle of an uncommitted node in the builder.
///
/// Only meaningful during the edit episode that produced it. Committed nodes
/// store [`NodeId`] children, so a draft can never leak into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftId(pub(crate) usize);

/// Either kind of handle, used while building a new tree shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Committed(NodeId),
    Draft(DraftId),
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef::Committed(id)
    }
}

impl From<DraftId> for NodeRef {
    fn from(id: DraftId) -> Self {
        NodeRef::Draft(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<R> {
    Leaf(Chunk),
    Branch { left: R, right: R },
}

/// Tree node, generic over the handle type of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<R> {
    pub kind: NodeKind<R>,
    pub summary: Summary,
    /// Height of the subtree; leaves are 0
    pub depth: u32,
}

impl<R: Copy> Node<R> {
    pub fn chunk(&self) -> Option<Chunk> {
        match self.kind {
            NodeKind::Leaf(chunk) => Some(chunk),
            NodeKind::Branch { .. } => None,
        }
    }

    pub fn children(&self) -> Option<(R, R)> {
        match self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Branch { left, right } => Some((left, right)),
        }
    }
}

impl Node<NodeId> {
    /// View of a committed node with children widened to [`NodeRef`].
    pub fn as_draft(&self) -> Node<NodeRef> {
        let kind = match self.kind {
            NodeKind::Leaf(chunk) => NodeKind::Leaf(chunk),
            NodeKind::Branch { left, right } => NodeKind::Branch {
                left: left.into(),
                right: right.into(),
            },
        };
        Node {
            kind,
            summary: self.summary,
            depth: self.depth,
        }
    }
}

/// A node living in the pool, with the number of owners referencing it.
///
/// Owners are parent nodes and [`Rope`](super::Rope) roots.
#[derive(Debug, Clone)]
pub struct Committed {
    pub node: Node<NodeId>,
    pub ref_count: u32,
}
