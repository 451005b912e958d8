use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::info;

use super::{BufferError, RopeBuffer, SaveOptions};
use crate::rope::Pool;

/// Handle of a buffer owned by a [`BufferManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

/// Owns every open buffer, with at most one buffer per file.
#[derive(Debug, Default)]
pub struct BufferManager {
    buffers: Pool<RopeBuffer>,
    by_path: FxHashMap<PathBuf, BufferId>,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffer already open for `path`, or loads it.
    pub fn get_or_open(&mut self, path: &Path) -> BufferId {
        let key = normalize(path);
        if let Some(&id) = self.by_path.get(&key) {
            info!(path = %path.display(), "using existing buffer");
            return id;
        }

        info!(path = %path.display(), "opening buffer");
        let buffer = RopeBuffer::load(Some(path));
        let id = BufferId(self.buffers.push(buffer));
        self.by_path.insert(key, id);
        id
    }

    /// An unnamed, empty buffer.
    pub fn create(&mut self) -> BufferId {
        BufferId(self.buffers.push(RopeBuffer::new()))
    }

    pub fn get(&self, id: BufferId) -> Option<&RopeBuffer> {
        self.buffers.get(id.0)
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut RopeBuffer> {
        self.buffers.get_mut(id.0)
    }

    pub fn find(&self, path: &Path) -> Option<BufferId> {
        self.by_path.get(&normalize(path)).copied()
    }

    /// Writes buffer `id` to `path` and files it under the new name.
    ///
    /// Fails without writing when `id` was closed or another open buffer
    /// already owns `path`.
    pub fn save_as(
        &mut self,
        id: BufferId,
        path: &Path,
        options: &SaveOptions,
    ) -> Result<(), BufferError> {
        let key = normalize(path);
        if self.by_path.get(&key).is_some_and(|&owner| owner != id) {
            return Err(BufferError::AlreadyOpen(path.to_path_buf()));
        }

        let buffer = self.buffers.get_mut(id.0).ok_or(BufferError::Closed)?;
        let previous = buffer.path().map(normalize);
        buffer.save_as(path, options)?;

        if let Some(previous) = previous {
            self.by_path.remove(&previous);
        }
        self.by_path.insert(normalize(path), id);
        Ok(())
    }

    /// Drops buffer `id`, returning it if it was open.
    pub fn close(&mut self, id: BufferId) -> Option<RopeBuffer> {
        if !self.buffers.contains(id.0) {
            return None;
        }
        let buffer = self.buffers.remove(id.0);
        if let Some(path) = buffer.path() {
            self.by_path.remove(&normalize(path));
        }
        Some(buffer)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BufferId, &RopeBuffer)> {
        self.buffers.iter().map(|(index, buffer)| (BufferId(index), buffer))
    }
}

/// Buffers are keyed by absolute path so `./a` and `a` share a buffer,
/// whether or not the file exists yet.
fn normalize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
