//! Per-node statistics used for offset and line/column addressing.

/// A contiguous run of bytes in a lineage's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk {
    /// Offset of the first byte in the backing storage
    pub index: usize,
    /// Number of bytes
    pub size: usize,
}

impl Chunk {
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    pub fn end(&self) -> usize {
        self.index + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Splits into `[0, at)` and `[at, size)`.
    pub fn split_at(&self, at: usize) -> (Chunk, Chunk) {
        let at = at.min(self.size);
        (
            Chunk::new(self.index, at),
            Chunk::new(self.index + at, self.size - at),
        )
    }
}

/// Aggregate statistics of a byte range.
///
/// Summaries form a monoid under [`Summary::combine`] with
/// `Summary::default()` as identity, so the aggregate of a subtree does not
/// depend on its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Summary {
    /// Total bytes
    pub size: usize,
    /// Number of `\n` bytes
    pub newlines: usize,
    /// Bytes after the final newline (or all bytes when there is none)
    pub last_line_chars: usize,
}

impl Summary {
    pub fn combine(left: &Summary, right: &Summary) -> Summary {
        Summary {
            size: left.size + right.size,
            newlines: left.newlines + right.newlines,
            last_line_chars: if right.newlines > 0 {
                right.last_line_chars
            } else {
                left.last_line_chars + right.last_line_chars
            },
        }
    }

    /// Folds one byte into the summary.
    pub fn accumulate(&mut self, byte: u8) {
        self.size += 1;
        if byte == b'\n' {
            self.newlines += 1;
            self.last_line_chars = 0;
        } else {
            self.last_line_chars += 1;
        }
    }

    pub fn of_bytes(bytes: &[u8]) -> Summary {
        let mut summary = Summary::default();
        for &byte in bytes {
            summary.accumulate(byte);
        }
        summary
    }
}

/// Summarizes chunks against a lineage's backing storage.
#[derive(Debug, Clone, Copy)]
pub struct Summarizer<'a> {
    text: &'a [u8],
}

impl<'a> Summarizer<'a> {
    pub fn new(text: &'a [u8]) -> Self {
        Self { text }
    }

    pub fn chunk(&self, chunk: &Chunk) -> Summary {
        Summary::of_bytes(&self.text[chunk.index..chunk.end()])
    }

    /// Summary of the first `len` bytes of `chunk`.
    pub fn chunk_prefix(&self, chunk: &Chunk, len: usize) -> Summary {
        self.chunk(&Chunk::new(chunk.index, len.min(chunk.size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(prop_oneof![Just(b'\n'), b'a'..=b'e'], 0..40)
    }

    #[test]
    fn test_chunk_summary() {
        let text = b"ab\ncde\nf";
        let summarizer = Summarizer::new(text);
        let summary = summarizer.chunk(&Chunk::new(0, text.len()));
        assert_eq!(
            summary,
            Summary {
                size: 8,
                newlines: 2,
                last_line_chars: 1
            }
        );
        let prefix = summarizer.chunk_prefix(&Chunk::new(0, text.len()), 3);
        assert_eq!(
            prefix,
            Summary {
                size: 3,
                newlines: 1,
                last_line_chars: 0
            }
        );
    }

    #[test]
    fn test_combine_without_newline_extends_last_line() {
        let left = Summary::of_bytes(b"x\nab");
        let right = Summary::of_bytes(b"cd");
        let combined = Summary::combine(&left, &right);
        assert_eq!(combined.last_line_chars, 4);
        assert_eq!(combined.newlines, 1);
        assert_eq!(combined.size, 6);
    }

    #[test]
    fn test_split_at_clamps() {
        let chunk = Chunk::new(10, 4);
        assert_eq!(chunk.split_at(1), (Chunk::new(10, 1), Chunk::new(11, 3)));
        assert_eq!(chunk.split_at(9), (Chunk::new(10, 4), Chunk::new(14, 0)));
    }

    proptest! {
        #[test]
        fn prop_combine_is_associative(
            a in bytes_strategy(),
            b in bytes_strategy(),
            c in bytes_strategy(),
        ) {
            let (a, b, c) = (
                Summary::of_bytes(&a),
                Summary::of_bytes(&b),
                Summary::of_bytes(&c),
            );
            prop_assert_eq!(
                Summary::combine(&Summary::combine(&a, &b), &c),
                Summary::combine(&a, &Summary::combine(&b, &c))
            );
        }

        #[test]
        fn prop_default_is_identity(a in bytes_strategy()) {
            let a = Summary::of_bytes(&a);
            prop_assert_eq!(Summary::combine(&Summary::default(), &a), a);
            prop_assert_eq!(Summary::combine(&a, &Summary::default()), a);
        }

        #[test]
        fn prop_combine_matches_concatenation(a in bytes_strategy(), b in bytes_strategy()) {
            let joined: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
            prop_assert_eq!(
                Summary::combine(&Summary::of_bytes(&a), &Summary::of_bytes(&b)),
                Summary::of_bytes(&joined)
            );
        }
    }
}
