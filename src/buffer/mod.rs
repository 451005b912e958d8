pub mod cursor;
pub mod manager;

#[cfg(test)]
mod tests;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use memmap2::Mmap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::rope::{Chunk, NodeId, Rope};
use cursor::{seek_index, seek_point, Bias};

pub use cursor::Cursor;
pub use manager::{BufferId, BufferManager};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("buffer has no file name")]
    Unnamed,
    #[error("{} is already open in another buffer", .0.display())]
    AlreadyOpen(PathBuf),
    #[error("buffer is no longer open")]
    Closed,
}

static REVISIONS: AtomicU64 = AtomicU64::new(1);

/// Revisions are unique across all buffers, so a cursor taken from one
/// buffer never matches the revision of another.
fn next_revision() -> u64 {
    REVISIONS.fetch_add(1, Ordering::Relaxed)
}

/// How [`RopeBuffer::save`] replaces the file on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Keep the previous contents as `<name>~` before replacing the file
    pub backup: bool,
}

/// A text document backed by a persistent rope.
///
/// The buffer always holds a root, even for an empty document, so every
/// position resolves to a leaf.
pub struct RopeBuffer {
    rope: Rope,
    path: Option<PathBuf>,
    last_edit: Option<Cursor>,
    revision: u64,
    modified: bool,
}

impl RopeBuffer {
    pub fn new() -> Self {
        Self::from_bytes(b"")
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let rope = Rope::from_bytes(bytes);
        let rope = if rope.is_empty() {
            rope.leaf(Chunk::default())
        } else {
            rope
        };
        Self {
            rope,
            path: None,
            last_edit: None,
            revision: next_revision(),
            modified: false,
        }
    }

    /// Loads `path`, falling back to an empty document that will be written
    /// to `path` on save when the file cannot be read.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::new();
        };

        match Self::open(path) {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!("{err}; starting with an empty buffer");
                let mut buffer = Self::new();
                buffer.path = Some(path.to_path_buf());
                buffer
            }
        }
    }

    /// Loads `path`, reporting any I/O failure.
    pub fn open(path: &Path) -> Result<Self, BufferError> {
        let read_error = |source| BufferError::Read {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(read_error)?;
        let len = file.metadata().map_err(read_error)?.len();
        let mut buffer = if len == 0 {
            Self::new()
        } else {
            // SAFETY: the map is only read while copying into the rope's own
            // storage and is dropped before this function returns.
            let map = unsafe { Mmap::map(&file) }.map_err(read_error)?;
            Self::from_bytes(&map)
        };
        buffer.path = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            bytes = buffer.len(),
            lines = buffer.count_lines(),
            "opened buffer"
        );
        Ok(buffer)
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// A handle on the current revision that stays valid across later edits.
    ///
    /// Taking a snapshot ends typing coalescing, so the next insert goes
    /// through the copy-on-write path and leaves the snapshot untouched.
    pub fn snapshot(&mut self) -> Rope {
        self.last_edit = None;
        self.rope.clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Changes with every edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.rope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.is_empty()
    }

    /// Number of lines; a document without newlines still has one.
    pub fn count_lines(&self) -> usize {
        self.rope.summary().newlines + 1
    }

    fn root(&self) -> NodeId {
        match self.rope.root() {
            Some(root) => root,
            None => panic!("rope buffer lost its root"),
        }
    }

    /// Cursor at byte `index`, clamped to the document.
    pub fn cursor_at(&self, index: usize) -> Cursor {
        let index = index.min(self.len());
        seek_index(&self.rope, self.root(), index, Bias::After, self.revision)
    }

    /// Cursor at `(line, column)`. The line is clamped to the document; a
    /// column past the end of the line stops at the end of the line.
    pub fn cursor_at_point(&self, line: usize, column: usize) -> Cursor {
        let line = line.min(self.rope.summary().newlines);
        seek_point(&self.rope, self.root(), line, column, self.revision)
    }

    /// Like [`RopeBuffer::cursor_at`] but resolves leaf boundaries to the
    /// leaf ending at `index`.
    pub(crate) fn insert_position(&self, index: usize) -> Cursor {
        let index = index.min(self.len());
        seek_index(&self.rope, self.root(), index, Bias::Before, self.revision)
    }

    pub fn is_eof(&self, cursor: &Cursor) -> bool {
        cursor.index >= self.len()
    }

    /// The byte under `cursor`, or `None` at the end of the document.
    pub fn char_at(&self, cursor: &Cursor) -> Option<u8> {
        if cursor.revision == self.revision {
            let store = self.rope.store();
            if let Some(chunk) = store.committed(cursor.leaf).chunk() {
                if cursor.offset < chunk.size {
                    return Some(store.text()[chunk.index + cursor.offset]);
                }
            }
        }
        self.byte_at(cursor.index)
    }

    pub fn byte_at(&self, index: usize) -> Option<u8> {
        if index >= self.len() {
            return None;
        }
        let cursor = self.cursor_at(index);
        let store = self.rope.store();
        let chunk = store.committed(cursor.leaf).chunk()?;
        store.text().get(chunk.index + cursor.offset).copied()
    }

    /// Bytes of `line` without its trailing newline.
    pub fn line(&self, line: usize) -> Vec<u8> {
        if line >= self.count_lines() {
            return Vec::new();
        }
        let start = self.cursor_at_point(line, 0).index;
        let mut bytes = Vec::new();
        self.rope.for_each_chunk_from(start, |chunk| {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    bytes.extend_from_slice(&chunk[..end]);
                    ControlFlow::Break(())
                }
                None => {
                    bytes.extend_from_slice(chunk);
                    ControlFlow::Continue(())
                }
            }
        });
        bytes
    }

    /// Length of `line` in bytes, excluding the newline.
    pub fn line_len(&self, line: usize) -> usize {
        let start = self.cursor_at_point(line, 0);
        let end = self.cursor_at_point(line, usize::MAX);
        end.index - start.index
    }

    /// Inserts `byte` before `cursor` and returns the cursor just after it.
    ///
    /// Consecutive inserts at the position returned by the previous insert
    /// grow the same chunk in place, up to
    /// [`CHUNK_MAX_SIZE`](crate::rope::CHUNK_MAX_SIZE) bytes, while no other
    /// revision shares it. Everything else goes through split and concat.
    pub fn insert(&mut self, cursor: Cursor, byte: u8) -> Cursor {
        let index = cursor.index.min(self.len());
        let coalesce = self
            .last_edit
            .is_some_and(|last| last.revision == self.revision && last.index == index);

        let grown = coalesce && {
            let target = self.insert_position(index);
            self.rope.grow_leaf(target.leaf, index, byte)
        };
        if !grown {
            let chunk = self.rope.append_text(&[byte]);
            let (left, right) = self.rope.split(index);
            let inserted = left.push(chunk);
            self.rope = inserted.concat(&right);
        }

        self.revision = next_revision();
        self.modified = true;
        let cursor = self.cursor_at(index + 1);
        self.last_edit = Some(cursor);
        cursor
    }

    /// Inserts every byte of `bytes` in order, returning the cursor after
    /// the last one.
    pub fn insert_bytes(&mut self, cursor: Cursor, bytes: &[u8]) -> Cursor {
        bytes
            .iter()
            .fold(cursor, |cursor, &byte| self.insert(cursor, byte))
    }

    /// Deletes the byte before `cursor` and returns the cursor where it was.
    /// Does nothing at the start of the document.
    pub fn remove(&mut self, cursor: Cursor) -> Cursor {
        let index = cursor.index.min(self.len());
        if index == 0 {
            return self.cursor_at(0);
        }

        let (before, rest) = self.rope.split(index - 1);
        let (_removed, after) = rest.split(1);
        let joined = before.concat(&after);
        self.rope = if joined.is_empty() {
            joined.leaf(Chunk::default())
        } else {
            joined
        };

        self.revision = next_revision();
        self.modified = true;
        self.last_edit = None;
        self.cursor_at(index - 1)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.rope.to_bytes()
    }

    /// Writes the document to its file.
    pub fn write_to_disk(&mut self) -> Result<(), BufferError> {
        self.save(&SaveOptions::default())
    }

    pub fn save(&mut self, options: &SaveOptions) -> Result<(), BufferError> {
        let path = self.path.clone().ok_or(BufferError::Unnamed)?;
        write_atomically(&path, &self.rope, options).map_err(|source| BufferError::Write {
            path: path.clone(),
            source,
        })?;
        self.modified = false;
        info!(path = %path.display(), bytes = self.len(), "saved buffer");
        Ok(())
    }

    /// Writes to `path` and adopts it as the buffer's file.
    pub fn save_as(
        &mut self,
        path: impl Into<PathBuf>,
        options: &SaveOptions,
    ) -> Result<(), BufferError> {
        self.path = Some(path.into());
        self.save(options)
    }
}

impl Default for RopeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RopeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl fmt::Debug for RopeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RopeBuffer")
            .field("path", &self.path)
            .field("len", &self.len())
            .field("revision", &self.revision)
            .field("modified", &self.modified)
            .finish()
    }
}

/// Streams the rope into a sibling temporary file and renames it over
/// `path`, so readers never observe a half-written file.
fn write_atomically(path: &Path, rope: &Rope, options: &SaveOptions) -> io::Result<()> {
    if options.backup && path.exists() {
        let backup = sibling(path, "", "~");
        reflink_copy::reflink_or_copy(path, &backup)?;
        debug!(backup = %backup.display(), "wrote backup");
    }

    let temp = sibling(path, ".", ".cordage-tmp");
    let result = (|| {
        let mut writer = BufWriter::new(File::create(&temp)?);
        let mut written = Ok(());
        rope.for_each_chunk_from(0, |chunk| match writer.write_all(chunk) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                written = Err(err);
                ControlFlow::Break(())
            }
        });
        written?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&temp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn sibling(path: &Path, prefix: &str, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{prefix}{name}{suffix}"))
}
