//! Persistent rope over byte chunks.
//!
//! A [`Rope`] is a handle on the root of an AVL-balanced binary tree whose
//! leaves reference [`Chunk`]s of an append-only byte array. Every rope
//! derived from the same starting rope shares one [`Store`] (pool, builder
//! and backing bytes), so edits produce new roots that share all untouched
//! subtrees with older revisions.
//!
//! # Edit episodes
//!
//! Each operation builds its new tree shape as drafts in the [`Builder`],
//! then commits the drafts reachable from the new root into the [`Pool`] and
//! clears the builder. Committing takes one reference on the new root; the
//! returned [`Rope`] owns that reference and gives it back on drop.
//!
//! # Ownership
//!
//! Cloning a rope retains its root, dropping it releases the root. A node
//! whose count reaches zero releases its children and returns its slot to
//! the pool, so letting the last handle of a revision go frees exactly the
//! nodes no other revision can reach.

pub mod builder;
pub mod node;
pub mod pool;
pub mod summary;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

use tracing::trace;

use builder::Builder;
pub use node::{Committed, DraftId, Node, NodeId, NodeKind, NodeRef};
pub use pool::Pool;
pub use summary::{Chunk, Summarizer, Summary};

/// Largest chunk built by bulk loading or grown by typing.
pub const CHUNK_MAX_SIZE: usize = 64;

/// State shared by every rope of one lineage.
#[derive(Debug, Default)]
pub struct Store {
    pool: Pool<Committed>,
    builder: Builder,
    text: Vec<u8>,
}

impl Store {
    fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn summarizer(&self) -> Summarizer<'_> {
        Summarizer::new(&self.text)
    }

    pub fn committed(&self, id: NodeId) -> &Node<NodeId> {
        &self.pool[id.0].node
    }

    pub fn ref_count(&self, id: NodeId) -> u32 {
        self.pool[id.0].ref_count
    }

    /// Number of committed nodes alive across the whole lineage.
    pub fn live_nodes(&self) -> usize {
        self.pool.len()
    }

    fn node(&self, node: NodeRef) -> Node<NodeRef> {
        match node {
            NodeRef::Committed(id) => self.pool[id.0].node.as_draft(),
            NodeRef::Draft(id) => *self.builder.get(id),
        }
    }

    fn summary(&self, node: NodeRef) -> Summary {
        match node {
            NodeRef::Committed(id) => self.pool[id.0].node.summary,
            NodeRef::Draft(id) => self.builder.get(id).summary,
        }
    }

    fn depth(&self, node: NodeRef) -> u32 {
        match node {
            NodeRef::Committed(id) => self.pool[id.0].node.depth,
            NodeRef::Draft(id) => self.builder.get(id).depth,
        }
    }

    fn children(&self, node: NodeRef) -> (NodeRef, NodeRef) {
        match self.node(node).children() {
            Some(children) => children,
            None => panic!("expected a branch node, found a leaf"),
        }
    }

    fn new_leaf(&mut self, chunk: Chunk) -> NodeRef {
        assert!(
            chunk.end() <= self.text.len(),
            "chunk {}..{} outside backing storage of {} bytes",
            chunk.index,
            chunk.end(),
            self.text.len()
        );
        let summary = self.summarizer().chunk(&chunk);
        let leaf = Node {
            kind: NodeKind::Leaf(chunk),
            summary,
            depth: 0,
        };
        self.builder.push(leaf).into()
    }

    fn new_branch(&mut self, left: NodeRef, right: NodeRef) -> NodeRef {
        let (left_summary, right_summary) = (self.summary(left), self.summary(right));
        let branch = Node {
            kind: NodeKind::Branch { left, right },
            summary: Summary::combine(&left_summary, &right_summary),
            depth: self.depth(left).max(self.depth(right)) + 1,
        };
        self.builder.push(branch).into()
    }

    fn copy_with_new_left(&mut self, node: NodeRef, left: NodeRef) -> NodeRef {
        let (_, right) = self.children(node);
        self.new_branch(left, right)
    }

    fn copy_with_new_right(&mut self, node: NodeRef, right: NodeRef) -> NodeRef {
        let (left, _) = self.children(node);
        self.new_branch(left, right)
    }

    fn rotate_left(&mut self, root: NodeRef) -> NodeRef {
        let (_, right) = self.children(root);
        let (right_left, _) = self.children(right);
        let new_left = self.copy_with_new_right(root, right_left);
        self.copy_with_new_left(right, new_left)
    }

    fn rotate_right(&mut self, root: NodeRef) -> NodeRef {
        let (left, _) = self.children(root);
        let (_, left_right) = self.children(left);
        let new_right = self.copy_with_new_left(root, left_right);
        self.copy_with_new_right(left, new_right)
    }

    /// `left.depth - right.depth`
    fn balance_factor(&self, left: NodeRef, right: NodeRef) -> i64 {
        i64::from(self.depth(left)) - i64::from(self.depth(right))
    }

    fn balance(&mut self, root: NodeRef) -> NodeRef {
        let Some((left, right)) = self.node(root).children() else {
            return root;
        };

        let factor = self.balance_factor(left, right);
        if factor < -1 {
            let (inner, outer) = self.children(right);
            let root = if self.depth(inner) > self.depth(outer) {
                let right = self.rotate_right(right);
                self.new_branch(left, right)
            } else {
                root
            };
            return self.rotate_left(root);
        }
        if factor > 1 {
            let (outer, inner) = self.children(left);
            let root = if self.depth(inner) > self.depth(outer) {
                let left = self.rotate_left(left);
                self.new_branch(left, right)
            } else {
                root
            };
            return self.rotate_right(root);
        }

        root
    }

    fn insert(&mut self, root: Option<NodeRef>, node: NodeRef, index: usize) -> NodeRef {
        let Some(root) = root else {
            return node;
        };

        let Some((left, right)) = self.node(root).children() else {
            return if index == 0 {
                self.new_branch(node, root)
            } else {
                self.new_branch(root, node)
            };
        };

        let left_size = self.summary(left).size;
        if index < left_size {
            let left = self.insert(Some(left), node, index);
            let copy = self.copy_with_new_left(root, left);
            self.balance(copy)
        } else {
            let right = self.insert(Some(right), node, index - left_size);
            let copy = self.copy_with_new_right(root, right);
            self.balance(copy)
        }
    }

    fn insert_right(&mut self, root: Option<NodeRef>, node: NodeRef) -> NodeRef {
        let Some(root) = root else {
            return node;
        };

        match self.node(root).children() {
            None => self.new_branch(root, node),
            Some((_, right)) => {
                let right = self.insert_right(Some(right), node);
                let copy = self.copy_with_new_right(root, right);
                self.balance(copy)
            }
        }
    }

    /// Splits into `[0, index)` and `[index, end)`. Empty halves are `None`.
    fn split(&mut self, root: NodeRef, index: usize) -> (Option<NodeRef>, Option<NodeRef>) {
        let node = self.node(root);
        match node.kind {
            NodeKind::Leaf(chunk) => {
                let (left_chunk, right_chunk) = chunk.split_at(index);
                if left_chunk.is_empty() && right_chunk.is_empty() {
                    return (None, None);
                }
                if right_chunk.is_empty() {
                    return (Some(root), None);
                }
                if left_chunk.is_empty() {
                    return (None, Some(root));
                }
                (
                    Some(self.new_leaf(left_chunk)),
                    Some(self.new_leaf(right_chunk)),
                )
            }
            NodeKind::Branch { left, right } => {
                let left_size = self.summary(left).size;
                if index < left_size {
                    let (split_left, split_right) = self.split(left, index);
                    (split_left, self.concatenate(split_right, Some(right)))
                } else {
                    let (split_left, split_right) = self.split(right, index - left_size);
                    (self.concatenate(Some(left), split_left), split_right)
                }
            }
        }
    }

    fn merge(&mut self, left: Option<NodeRef>, right: Option<NodeRef>) -> Option<NodeRef> {
        let Some(left) = left else {
            return right;
        };
        let Some(right) = right else {
            return Some(left);
        };

        match self.node(right).children() {
            None => Some(self.insert_right(Some(left), right)),
            Some((right_left, right_right)) => {
                let merged = self.merge(Some(left), Some(right_left));
                self.merge(merged, Some(right_right))
            }
        }
    }

    /// Joins `left` under the left spine of the deeper `right`.
    fn concatenate_left(&mut self, left: NodeRef, right: NodeRef) -> NodeRef {
        if self.balance_factor(left, right) >= -1 {
            return self.new_branch(left, right);
        }

        let (right_left, _) = self.children(right);
        let merged = self.concatenate_left(left, right_left);
        let copy = self.copy_with_new_left(right, merged);
        self.balance(copy)
    }

    /// Joins `right` under the right spine of the deeper `left`.
    fn concatenate_right(&mut self, left: NodeRef, right: NodeRef) -> NodeRef {
        if self.balance_factor(left, right) <= 1 {
            return self.new_branch(left, right);
        }

        let (_, left_right) = self.children(left);
        let merged = self.concatenate_right(left_right, right);
        let copy = self.copy_with_new_right(left, merged);
        self.balance(copy)
    }

    fn concatenate(&mut self, left: Option<NodeRef>, right: Option<NodeRef>) -> Option<NodeRef> {
        let Some(left) = left else {
            return right;
        };
        let Some(right) = right else {
            return Some(left);
        };

        if self.balance_factor(left, right) < 0 {
            Some(self.concatenate_left(left, right))
        } else {
            Some(self.concatenate_right(left, right))
        }
    }

    /// Builds a perfectly balanced tree over consecutive chunks.
    fn build_balanced(&mut self, chunks: &[Chunk]) -> Option<NodeRef> {
        match chunks {
            [] => None,
            [chunk] => Some(self.new_leaf(*chunk)),
            _ => {
                let (left, right) = chunks.split_at(chunks.len() / 2);
                let left = self.build_balanced(left)?;
                let right = self.build_balanced(right)?;
                Some(self.new_branch(left, right))
            }
        }
    }

    fn commit(&mut self, root: Option<NodeRef>) -> Option<NodeId> {
        root.map(|root| self.commit_ref(root))
    }

    /// Materializes the drafts reachable from `node` and takes one reference
    /// on the result on behalf of the caller.
    fn commit_ref(&mut self, node: NodeRef) -> NodeId {
        let id = match node {
            NodeRef::Committed(id) => id,
            NodeRef::Draft(draft) => {
                let draft = *self.builder.get(draft);
                let kind = match draft.kind {
                    NodeKind::Leaf(chunk) => NodeKind::Leaf(chunk),
                    NodeKind::Branch { left, right } => NodeKind::Branch {
                        left: self.commit_ref(left),
                        right: self.commit_ref(right),
                    },
                };
                let committed = Committed {
                    node: Node {
                        kind,
                        summary: draft.summary,
                        depth: draft.depth,
                    },
                    ref_count: 0,
                };
                NodeId(self.pool.push(committed))
            }
        };
        self.retain(id);
        id
    }

    fn end_episode(&mut self) {
        if !self.builder.is_empty() {
            trace!(
                drafts = self.builder.len(),
                live = self.pool.len(),
                "edit episode committed"
            );
        }
        self.builder.clear();
    }

    fn retain(&mut self, id: NodeId) {
        self.pool[id.0].ref_count += 1;
    }

    fn release(&mut self, id: NodeId) {
        let slot = &mut self.pool[id.0];
        assert!(slot.ref_count > 0, "ref count underflow on node {}", id.0);
        slot.ref_count -= 1;
        if slot.ref_count > 0 {
            return;
        }

        let freed = self.pool.remove(id.0);
        if let NodeKind::Branch { left, right } = freed.node.kind {
            self.release(left);
            self.release(right);
        }
    }

    /// Grows `leaf`, which must be the leaf ending at `index`, by `byte`,
    /// patching ancestor summaries in place.
    ///
    /// Refuses (returning `false`, touching nothing) unless the descent to
    /// `index` reaches `leaf`, the leaf ends at the tail of the backing
    /// storage, has room below [`CHUNK_MAX_SIZE`], and it and every ancestor
    /// are referenced exactly once. The last condition keeps the mutation
    /// invisible to every other revision.
    fn grow_leaf(&mut self, root: NodeId, leaf: NodeId, index: usize, byte: u8) -> bool {
        let mut path = Vec::new();
        let mut current = root;
        let mut remaining = index;
        let chunk = loop {
            if self.ref_count(current) != 1 {
                return false;
            }
            path.push(current);
            match self.committed(current).kind {
                NodeKind::Leaf(chunk) => break chunk,
                NodeKind::Branch { left, right } => {
                    let left_size = self.committed(left).summary.size;
                    if remaining <= left_size {
                        current = left;
                    } else {
                        remaining -= left_size;
                        current = right;
                    }
                }
            }
        };

        if current != leaf
            || remaining != chunk.size
            || chunk.size >= CHUNK_MAX_SIZE
            || chunk.end() != self.text.len()
        {
            return false;
        }

        self.text.push(byte);
        let grown = Chunk::new(chunk.index, chunk.size + 1);
        let summary = self.summarizer().chunk(&grown);
        let mut nodes = path.into_iter().rev();
        if let Some(leaf) = nodes.next() {
            let node = &mut self.pool[leaf.0].node;
            node.kind = NodeKind::Leaf(grown);
            node.summary = summary;
        }
        for ancestor in nodes {
            let (left, right) = match self.committed(ancestor).kind {
                NodeKind::Branch { left, right } => (left, right),
                NodeKind::Leaf(_) => unreachable!("leaf above the grown leaf"),
            };
            let summary = Summary::combine(
                &self.committed(left).summary,
                &self.committed(right).summary,
            );
            self.pool[ancestor.0].node.summary = summary;
        }
        true
    }
}

/// A handle on one revision of a rope.
pub struct Rope {
    root: Option<NodeId>,
    store: Rc<RefCell<Store>>,
}

impl Rope {
    /// An empty rope starting a new lineage.
    pub fn new() -> Self {
        Self {
            root: None,
            store: Rc::new(RefCell::new(Store::new())),
        }
    }

    /// A new lineage holding `bytes`, cut into chunks of at most
    /// [`CHUNK_MAX_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let rope = Rope::new();
        let text = rope.append_text(bytes);
        let chunks: Vec<Chunk> = (text.index..text.end())
            .step_by(CHUNK_MAX_SIZE)
            .map(|start| Chunk::new(start, CHUNK_MAX_SIZE.min(text.end() - start)))
            .collect();
        let root = rope.episode(|store| {
            let root = store.build_balanced(&chunks);
            store.commit(root)
        });
        rope.derive(root)
    }

    /// An empty rope sharing this rope's lineage.
    pub fn empty(&self) -> Rope {
        self.derive(None)
    }

    /// A single-leaf rope over `chunk`. The chunk may be empty.
    pub fn leaf(&self, chunk: Chunk) -> Rope {
        let root = self.episode(|store| {
            let leaf = store.new_leaf(chunk);
            store.commit(Some(leaf))
        });
        self.derive(root)
    }

    pub fn len(&self) -> usize {
        self.summary().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> Summary {
        match self.root {
            Some(root) => self.store.borrow().committed(root).summary,
            None => Summary::default(),
        }
    }

    /// Height of the tree; `None` for an empty rope.
    pub fn depth(&self) -> Option<u32> {
        self.root.map(|root| self.store.borrow().committed(root).depth)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn same_lineage(&self, other: &Rope) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    /// Committed nodes alive across the lineage.
    pub fn live_nodes(&self) -> usize {
        self.store.borrow().live_nodes()
    }

    pub(crate) fn store(&self) -> Ref<'_, Store> {
        self.store.borrow()
    }

    /// Appends bytes to the lineage's backing storage and returns the chunk
    /// covering them. The rope itself is unchanged.
    pub fn append_text(&self, bytes: &[u8]) -> Chunk {
        let mut store = self.store.borrow_mut();
        let index = store.text.len();
        store.text.extend_from_slice(bytes);
        Chunk::new(index, bytes.len())
    }

    /// New revision with a leaf for `chunk` inserted at byte `index`.
    pub fn insert(&self, chunk: Chunk, index: usize) -> Rope {
        let index = index.min(self.len());
        let root = self.episode(|store| {
            let leaf = store.new_leaf(chunk);
            let root = store.insert(self.root.map(NodeRef::from), leaf, index);
            store.commit(Some(root))
        });
        self.derive(root)
    }

    /// New revision with a leaf for `chunk` appended at the end.
    pub fn push(&self, chunk: Chunk) -> Rope {
        let root = self.episode(|store| {
            let leaf = store.new_leaf(chunk);
            let root = store.insert_right(self.root.map(NodeRef::from), leaf);
            store.commit(Some(root))
        });
        self.derive(root)
    }

    /// Splits into ropes holding `[0, index)` and `[index, len)`.
    pub fn split(&self, index: usize) -> (Rope, Rope) {
        let index = index.min(self.len());
        let (left, right) = self.episode(|store| {
            let (left, right) = match self.root {
                Some(root) => store.split(root.into(), index),
                None => (None, None),
            };
            (store.commit(left), store.commit(right))
        });
        (self.derive(left), self.derive(right))
    }

    /// Appends `other` by re-inserting each of its leaves on the right spine.
    pub fn merge(&self, other: &Rope) -> Rope {
        self.assert_same_lineage(other);
        let root = self.episode(|store| {
            let root = store.merge(self.root.map(NodeRef::from), other.root.map(NodeRef::from));
            store.commit(root)
        });
        self.derive(root)
    }

    /// Appends `other`, attaching the shallower tree near the leaves of the
    /// deeper one.
    pub fn concat(&self, other: &Rope) -> Rope {
        self.assert_same_lineage(other);
        let root = self.episode(|store| {
            let root =
                store.concatenate(self.root.map(NodeRef::from), other.root.map(NodeRef::from));
            store.commit(root)
        });
        self.derive(root)
    }

    /// Extends `leaf`, the leaf ending at `index`, with `byte` in place.
    ///
    /// Only succeeds when no other revision can observe the change; see
    /// [`Store::grow_leaf`] for the exact conditions.
    pub(crate) fn grow_leaf(&mut self, leaf: NodeId, index: usize, byte: u8) -> bool {
        match self.root {
            Some(root) => self.store.borrow_mut().grow_leaf(root, leaf, index, byte),
            None => false,
        }
    }

    /// Calls `f` with the bytes of each leaf in order, starting at byte
    /// `start`, until `f` breaks.
    pub fn for_each_chunk_from<F>(&self, start: usize, mut f: F)
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        let Some(root) = self.root else {
            return;
        };
        let store = self.store.borrow();
        let mut pending = Vec::new();
        let mut current = root;
        let mut skip = start;
        loop {
            match store.committed(current).kind {
                NodeKind::Branch { left, right } => {
                    let left_size = store.committed(left).summary.size;
                    if skip < left_size {
                        pending.push(right);
                        current = left;
                    } else {
                        skip -= left_size;
                        current = right;
                    }
                }
                NodeKind::Leaf(chunk) => {
                    let from = chunk.index + skip.min(chunk.size);
                    let bytes = &store.text[from..chunk.end()];
                    if !bytes.is_empty() && f(bytes).is_break() {
                        return;
                    }
                    break;
                }
            }
        }

        while let Some(mut current) = pending.pop() {
            loop {
                match store.committed(current).kind {
                    NodeKind::Branch { left, right } => {
                        pending.push(right);
                        current = left;
                    }
                    NodeKind::Leaf(chunk) => {
                        let bytes = &store.text[chunk.index..chunk.end()];
                        if !bytes.is_empty() && f(bytes).is_break() {
                            return;
                        }
                        break;
                    }
                }
            }
        }
    }

    /// The full content, by in-order traversal.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        self.for_each_chunk_from(0, |chunk| {
            bytes.extend_from_slice(chunk);
            ControlFlow::Continue(())
        });
        bytes
    }

    pub fn leaf_count(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let store = self.store.borrow();
        let mut pending = vec![root];
        let mut leaves = 0;
        while let Some(node) = pending.pop() {
            match store.committed(node).kind {
                NodeKind::Leaf(_) => leaves += 1,
                NodeKind::Branch { left, right } => {
                    pending.push(left);
                    pending.push(right);
                }
            }
        }
        leaves
    }

    /// Whether every branch has children whose depths differ by at most one.
    pub fn is_balanced(&self) -> bool {
        let Some(root) = self.root else {
            return true;
        };
        let store = self.store.borrow();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            if let NodeKind::Branch { left, right } = store.committed(node).kind {
                let (l, r) = (store.committed(left).depth, store.committed(right).depth);
                if l.abs_diff(r) > 1 {
                    return false;
                }
                pending.push(left);
                pending.push(right);
            }
        }
        true
    }

    /// Panics if any structural invariant of the tree is broken.
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            return;
        };
        let store = self.store.borrow();
        let summarizer = store.summarizer();
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            assert!(
                store.ref_count(id) > 0,
                "reachable node {} has no owner",
                id.0
            );
            let node = store.committed(id);
            match node.kind {
                NodeKind::Leaf(chunk) => {
                    assert_eq!(node.depth, 0, "leaf {} has nonzero depth", id.0);
                    assert_eq!(node.summary, summarizer.chunk(&chunk), "stale leaf summary");
                    assert!(
                        !chunk.is_empty() || id == root,
                        "empty leaf {} below the root",
                        id.0
                    );
                }
                NodeKind::Branch { left, right } => {
                    let (l, r) = (store.committed(left), store.committed(right));
                    assert_eq!(
                        node.summary,
                        Summary::combine(&l.summary, &r.summary),
                        "stale branch summary on {}",
                        id.0
                    );
                    assert_eq!(
                        node.depth,
                        l.depth.max(r.depth) + 1,
                        "wrong depth on {}",
                        id.0
                    );
                    assert!(l.depth.abs_diff(r.depth) <= 1, "unbalanced node {}", id.0);
                    pending.push(left);
                    pending.push(right);
                }
            }
        }
    }

    fn episode<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        let mut store = self.store.borrow_mut();
        let result = f(&mut store);
        store.end_episode();
        result
    }

    /// Wraps a root that already carries a reference for the new handle.
    fn derive(&self, root: Option<NodeId>) -> Rope {
        Rope {
            root,
            store: Rc::clone(&self.store),
        }
    }

    fn assert_same_lineage(&self, other: &Rope) {
        assert!(
            self.same_lineage(other),
            "cannot join ropes from different lineages"
        );
    }
}

impl Default for Rope {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Rope {
    fn clone(&self) -> Self {
        if let Some(root) = self.root {
            self.store.borrow_mut().retain(root);
        }
        self.derive(self.root)
    }
}

impl Drop for Rope {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.store.borrow_mut().release(root);
        }
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rope")
            .field("root", &self.root)
            .field("len", &self.len())
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::cursor::{seek_index, Bias};

    fn text(rope: &Rope) -> String {
        String::from_utf8(rope.to_bytes()).unwrap()
    }

    fn leaf_ending_at(rope: &Rope, index: usize) -> NodeId {
        let root = rope.root().unwrap();
        seek_index(rope, root, index, Bias::Before, 0).leaf
    }

    /// Builds a rope one single-byte leaf at a time, the way typing does.
    fn rope_of_leaves(content: &str) -> Rope {
        let mut rope = Rope::new();
        for byte in content.bytes() {
            let chunk = rope.append_text(&[byte]);
            rope = rope.push(chunk);
        }
        rope
    }

    #[test]
    fn test_from_bytes_chunks_content() {
        let content = "x".repeat(200);
        let rope = Rope::from_bytes(content.as_bytes());
        assert_eq!(rope.len(), 200);
        assert_eq!(rope.leaf_count(), 4);
        assert_eq!(text(&rope), content);
        rope.assert_invariants();
    }

    #[test]
    fn test_empty_rope() {
        let rope = Rope::from_bytes(b"");
        assert!(rope.is_empty());
        assert_eq!(rope.depth(), None);
        assert_eq!(rope.to_bytes(), Vec::<u8>::new());
        let (left, right) = rope.split(3);
        assert!(left.is_empty() && right.is_empty());
    }

    #[test]
    fn test_insert_at_leaf_boundaries() {
        let rope = rope_of_leaves("ace");
        let b = rope.append_text(b"b");
        let rope = rope.insert(b, 1);
        let d = rope.append_text(b"d");
        let rope = rope.insert(d, 3);
        let start = rope.append_text(b">");
        let rope = rope.insert(start, 0);
        assert_eq!(text(&rope), ">abcde");
        rope.assert_invariants();
    }

    #[test]
    fn test_insert_keeps_old_revision() {
        let before = rope_of_leaves("hello");
        let bang = before.append_text(b"!");
        let after = before.insert(bang, 5);
        assert_eq!(text(&before), "hello");
        assert_eq!(text(&after), "hello!");
    }

    #[test]
    fn test_push_stays_balanced() {
        let rope = rope_of_leaves(&"abcdefghij".repeat(20));
        assert!(rope.is_balanced());
        // 200 leaves fit in an AVL tree of height at most 1.44 log2(n).
        assert!(rope.depth().unwrap() <= 11);
        rope.assert_invariants();
    }

    #[test]
    fn test_split_every_index() {
        let content = "one\ntwo\nthree\nfour";
        let rope = rope_of_leaves(content);
        for k in 0..=content.len() {
            let (left, right) = rope.split(k);
            assert_eq!(text(&left), &content[..k]);
            assert_eq!(text(&right), &content[k..]);
            left.assert_invariants();
            right.assert_invariants();
        }
    }

    #[test]
    fn test_split_inside_chunk() {
        let rope = Rope::from_bytes(b"abcdefgh");
        let (left, right) = rope.split(3);
        assert_eq!(left.to_bytes(), b"abc");
        assert_eq!(right.to_bytes(), b"defgh");
    }

    #[test]
    fn test_split_clamps_past_end() {
        let rope = Rope::from_bytes(b"abc");
        let (left, right) = rope.split(99);
        assert_eq!(left.to_bytes(), b"abc");
        assert!(right.is_empty());
    }

    #[test]
    fn test_merge_and_concat_agree() {
        let rope = rope_of_leaves(&"0123456789".repeat(5));
        let (left, right) = rope.split(13);
        let merged = left.merge(&right);
        let concatenated = left.concat(&right);
        assert_eq!(merged.to_bytes(), rope.to_bytes());
        assert_eq!(concatenated.to_bytes(), rope.to_bytes());
        merged.assert_invariants();
        concatenated.assert_invariants();
    }

    #[test]
    fn test_concat_uneven_heights() {
        let big = rope_of_leaves(&"x".repeat(300));
        let small = big.leaf(big.append_text(b"yz"));
        let joined = big.concat(&small);
        assert!(joined.is_balanced());
        assert_eq!(joined.len(), 302);
        let joined = small.concat(&big);
        assert!(joined.is_balanced());
        assert_eq!(&joined.to_bytes()[..3], b"yzx");
    }

    #[test]
    fn test_drop_returns_nodes() {
        let base = Rope::from_bytes(&[b'a'; 500]);
        let baseline = base.live_nodes();
        {
            let (left, right) = base.split(250);
            let joined = left.concat(&right);
            let extra = joined.append_text(b"!");
            let _inserted = joined.insert(extra, 17);
            let _copy = joined.clone();
            assert!(base.live_nodes() > baseline);
        }
        assert_eq!(base.live_nodes(), baseline);
        drop(base);
    }

    #[test]
    fn test_shared_subtrees_survive_release() {
        let base = rope_of_leaves("shared content");
        let (left, right) = base.split(6);
        drop(base);
        assert_eq!(text(&left), "shared");
        assert_eq!(text(&right), " content");
        left.assert_invariants();
        right.assert_invariants();
    }

    #[test]
    fn test_grow_leaf_requires_exclusive_path() {
        let mut rope = Rope::new();
        let chunk = rope.append_text(b"a");
        rope = rope.push(chunk);
        let leaf = leaf_ending_at(&rope, 1);
        assert!(rope.grow_leaf(leaf, 1, b'b'));
        assert_eq!(rope.to_bytes(), b"ab");
        rope.assert_invariants();

        let snapshot = rope.clone();
        let leaf = leaf_ending_at(&rope, 2);
        assert!(!rope.grow_leaf(leaf, 2, b'c'));
        assert_eq!(snapshot.to_bytes(), b"ab");
    }

    #[test]
    fn test_grow_leaf_requires_tail_chunk() {
        let mut rope = Rope::new();
        let first = rope.append_text(b"a");
        let second = rope.append_text(b"b");
        rope = rope.push(first);
        rope = rope.push(second);
        let (a, b) = (leaf_ending_at(&rope, 1), leaf_ending_at(&rope, 2));
        // "a" ends at offset 1 but storage continues with "b".
        assert!(!rope.grow_leaf(a, 1, b'x'));
        // The descent to offset 2 reaches "b", not "a".
        assert!(!rope.grow_leaf(a, 2, b'x'));
        assert!(rope.grow_leaf(b, 2, b'c'));
        assert_eq!(rope.to_bytes(), b"abc");
        rope.assert_invariants();
    }

    #[test]
    fn test_for_each_chunk_from_offset() {
        let rope = Rope::from_bytes(&(0..=255u8).collect::<Vec<_>>());
        let mut seen = Vec::new();
        rope.for_each_chunk_from(100, |chunk| {
            seen.extend_from_slice(chunk);
            if seen.len() >= 10 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(&seen[..10], &(100..110u8).collect::<Vec<_>>()[..]);
    }

    #[test]
    #[should_panic(expected = "different lineages")]
    fn test_concat_across_lineages_panics() {
        let a = Rope::from_bytes(b"a");
        let b = Rope::from_bytes(b"b");
        let _ = a.concat(&b);
    }
}
