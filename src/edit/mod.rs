use crate::buffer::{Cursor, RopeBuffer};
use crate::navigation::refresh;

/// Basic edit operations on a buffer.
///
/// Each takes the caller's cursor, which may be stale, and returns the
/// cursor where the caret belongs afterwards.
pub struct EditOperations;

impl EditOperations {
    /// Insert text before the cursor
    pub fn insert_text(buffer: &mut RopeBuffer, cursor: Cursor, text: &str) -> Cursor {
        let cursor = refresh(buffer, cursor);
        buffer.insert_bytes(cursor, text.as_bytes())
    }

    pub fn insert_char(buffer: &mut RopeBuffer, cursor: Cursor, c: char) -> Cursor {
        let mut encoded = [0; 4];
        Self::insert_text(buffer, cursor, c.encode_utf8(&mut encoded))
    }

    pub fn newline(buffer: &mut RopeBuffer, cursor: Cursor) -> Cursor {
        Self::insert_text(buffer, cursor, "\n")
    }

    /// Tabs are inserted as `width` spaces
    pub fn tab(buffer: &mut RopeBuffer, cursor: Cursor, width: usize) -> Cursor {
        Self::insert_text(buffer, cursor, &" ".repeat(width))
    }

    /// Delete the byte before the cursor
    pub fn backspace(buffer: &mut RopeBuffer, cursor: Cursor) -> Cursor {
        let cursor = refresh(buffer, cursor);
        buffer.remove(cursor)
    }

    /// Delete the byte under the cursor
    pub fn delete_forward(buffer: &mut RopeBuffer, cursor: Cursor) -> Cursor {
        let cursor = refresh(buffer, cursor);
        if buffer.is_eof(&cursor) {
            return cursor;
        }
        let next = buffer.cursor_at(cursor.index + 1);
        buffer.remove(next)
    }

    /// Start a new line below the cursor's line and move onto it
    pub fn open_line_below(buffer: &mut RopeBuffer, cursor: Cursor) -> Cursor {
        let cursor = refresh(buffer, cursor);
        let end = buffer.cursor_at_point(cursor.line(), usize::MAX);
        Self::newline(buffer, end)
    }

    /// Start a new line above the cursor's line and move onto it
    pub fn open_line_above(buffer: &mut RopeBuffer, cursor: Cursor) -> Cursor {
        let cursor = refresh(buffer, cursor);
        let start = buffer.cursor_at_point(cursor.line(), 0);
        let line_start = start.index;
        Self::newline(buffer, start);
        buffer.cursor_at(line_start)
    }
}
