use crate::rope::{NodeId, NodeKind, Rope, Summary};

/// A resolved position in a buffer.
///
/// Cursors are derived by descending the tree and are only a cheap view of
/// the revision they were computed against. After an edit, ask the buffer
/// for a fresh one; stale cursors are still safe to pass back in, only their
/// `index` is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Leaf holding the position
    pub(crate) leaf: NodeId,
    /// Byte offset from the start of the document
    pub index: usize,
    /// Byte offset within the leaf's chunk
    pub offset: usize,
    /// Statistics of everything before `index`
    pub summary: Summary,
    pub(crate) revision: u64,
}

impl Cursor {
    /// Line number (0-indexed)
    pub fn line(&self) -> usize {
        self.summary.newlines
    }

    /// Column number (0-indexed, in bytes)
    pub fn column(&self) -> usize {
        self.summary.last_line_chars
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Which leaf wins when an offset falls exactly on a leaf boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bias {
    /// The leaf ending at the offset; used to find the leaf being typed into
    Before,
    /// The leaf starting at the offset
    After,
}

/// Descends to the leaf holding byte `index`, accumulating the prefix summary.
pub(crate) fn seek_index(
    rope: &Rope,
    root: NodeId,
    index: usize,
    bias: Bias,
    revision: u64,
) -> Cursor {
    let store = rope.store();
    let summarizer = store.summarizer();
    let mut current = root;
    let mut remaining = index;
    let mut accumulated = Summary::default();
    loop {
        match store.committed(current).kind {
            NodeKind::Branch { left, right } => {
                let left_summary = store.committed(left).summary;
                let go_left = match bias {
                    Bias::Before => remaining <= left_summary.size,
                    Bias::After => remaining < left_summary.size,
                };
                if go_left {
                    current = left;
                } else {
                    remaining -= left_summary.size;
                    accumulated = Summary::combine(&accumulated, &left_summary);
                    current = right;
                }
            }
            NodeKind::Leaf(chunk) => {
                let offset = remaining.min(chunk.size);
                let summary =
                    Summary::combine(&accumulated, &summarizer.chunk_prefix(&chunk, offset));
                return Cursor {
                    leaf: current,
                    index: summary.size,
                    offset,
                    summary,
                    revision,
                };
            }
        }
    }
}

/// Descends to `(line, column)`.
///
/// `line` must already be clamped to the document. A column past the end of
/// its line stops at the line's newline, or at the end of the last leaf the
/// line reaches.
pub(crate) fn seek_point(
    rope: &Rope,
    root: NodeId,
    line: usize,
    column: usize,
    revision: u64,
) -> Cursor {
    let store = rope.store();
    let summarizer = store.summarizer();
    let mut current = root;
    let (mut want_line, mut want_column) = (line, column);
    let mut accumulated = Summary::default();
    loop {
        match store.committed(current).kind {
            NodeKind::Branch { left, right } => {
                let left_summary = store.committed(left).summary;
                if want_line == left_summary.newlines
                    && want_column >= left_summary.last_line_chars
                {
                    // Target sits at or past the end of the left side's last line.
                    want_column -= left_summary.last_line_chars;
                    want_line = 0;
                    accumulated = Summary::combine(&accumulated, &left_summary);
                    current = right;
                } else if want_line <= left_summary.newlines {
                    current = left;
                } else {
                    want_line -= left_summary.newlines;
                    accumulated = Summary::combine(&accumulated, &left_summary);
                    current = right;
                }
            }
            NodeKind::Leaf(chunk) => {
                let bytes = &store.text()[chunk.index..chunk.end()];
                let (mut line, mut column, mut offset) = (0, 0, 0);
                while offset < bytes.len() {
                    if line == want_line && column == want_column {
                        break;
                    }
                    if bytes[offset] == b'\n' {
                        if line == want_line {
                            break;
                        }
                        line += 1;
                        column = 0;
                    } else {
                        column += 1;
                    }
                    offset += 1;
                }

                let summary =
                    Summary::combine(&accumulated, &summarizer.chunk_prefix(&chunk, offset));
                return Cursor {
                    leaf: current,
                    index: summary.size,
                    offset,
                    summary,
                    revision,
                };
            }
        }
    }
}
