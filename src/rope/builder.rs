//! Staging area for nodes of a tree shape that has not been committed yet.
//!
//! Balancing and splitting create many intermediate nodes that never survive
//! into the final tree. Building them here costs a vector push; only the ones
//! reachable from the final root are copied into the pool and ref counted.

use super::node::{DraftId, Node, NodeRef};

#[derive(Debug, Default)]
pub struct Builder {
    drafts: Vec<Node<NodeRef>>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node<NodeRef>) -> DraftId {
        self.drafts.push(node);
        DraftId(self.drafts.len() - 1)
    }

    pub fn get(&self, id: DraftId) -> &Node<NodeRef> {
        match self.drafts.get(id.0) {
            Some(node) => node,
            None => panic!("draft {} used outside of its edit episode", id.0),
        }
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Ends the episode. Drafts own no pool slots, so nothing is freed.
    pub fn clear(&mut self) {
        self.drafts.clear();
    }
}
