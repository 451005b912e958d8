//! Cursor motions over a [`RopeBuffer`].
//!
//! Every motion starts from a cursor refreshed against the buffer's current
//! revision and returns a fresh one. Vertical motions aim for the caller's
//! `want_column` so the column survives passing through short lines; every
//! other motion resets it to where the cursor lands.

use crate::buffer::{Cursor, RopeBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePosition {
    /// 0 - line start
    Start,
    /// ^ - first non-whitespace
    FirstNonBlank,
    /// $ - line end
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Move by bytes: h, l
    Char(Direction, usize),
    /// Move by lines: j, k
    Line(Direction, usize),
    /// Move past the next or previous word: w, b
    Word(Direction),
    /// Move to the next blank line, or the previous one: }, {
    Block(Direction),
    LinePosition(LinePosition),
    /// Start or end of the document: gg, G
    Document(Direction),
}

impl Motion {
    pub fn is_vertical(&self) -> bool {
        matches!(self, Motion::Line(..) | Motion::Block(_))
    }

    /// Moves `cursor`, updating `want_column` unless the motion is vertical.
    pub fn apply(self, buffer: &RopeBuffer, cursor: Cursor, want_column: &mut usize) -> Cursor {
        let cursor = refresh(buffer, cursor);
        let moved = match self {
            Motion::Char(Direction::Forward, count) => buffer.cursor_at(cursor.index + count),
            Motion::Char(Direction::Backward, count) => {
                buffer.cursor_at(cursor.index.saturating_sub(count))
            }
            Motion::Line(Direction::Forward, count) => {
                buffer.cursor_at_point(cursor.line() + count, *want_column)
            }
            Motion::Line(Direction::Backward, count) => {
                buffer.cursor_at_point(cursor.line().saturating_sub(count), *want_column)
            }
            Motion::Word(direction) => word(buffer, cursor, direction),
            Motion::Block(direction) => {
                buffer.cursor_at_point(block(buffer, cursor.line(), direction), *want_column)
            }
            Motion::LinePosition(LinePosition::Start) => buffer.cursor_at_point(cursor.line(), 0),
            Motion::LinePosition(LinePosition::FirstNonBlank) => {
                let line = buffer.line(cursor.line());
                let indent = line.iter().take_while(|b| b.is_ascii_whitespace()).count();
                buffer.cursor_at_point(cursor.line(), indent)
            }
            Motion::LinePosition(LinePosition::End) => {
                buffer.cursor_at_point(cursor.line(), usize::MAX)
            }
            Motion::Document(Direction::Backward) => buffer.cursor_at(0),
            Motion::Document(Direction::Forward) => buffer.cursor_at(buffer.len()),
        };

        if !self.is_vertical() {
            *want_column = moved.column();
        }
        moved
    }
}

/// `cursor` if it belongs to the buffer's current revision, otherwise a new
/// cursor at the same byte offset.
pub fn refresh(buffer: &RopeBuffer, cursor: Cursor) -> Cursor {
    if cursor.revision() == buffer.revision() {
        cursor
    } else {
        buffer.cursor_at(cursor.index)
    }
}

/// Skips whitespace, then the word after it.
fn word(buffer: &RopeBuffer, cursor: Cursor, direction: Direction) -> Cursor {
    let mut index = cursor.index;
    let mut seen_word = false;
    match direction {
        Direction::Forward => {
            while let Some(byte) = buffer.byte_at(index) {
                if !byte.is_ascii_whitespace() {
                    seen_word = true;
                } else if seen_word {
                    break;
                }
                index += 1;
            }
        }
        Direction::Backward => {
            while index > 0 {
                let Some(byte) = buffer.byte_at(index - 1) else {
                    break;
                };
                if !byte.is_ascii_whitespace() {
                    seen_word = true;
                } else if seen_word {
                    break;
                }
                index -= 1;
            }
        }
    }
    buffer.cursor_at(index)
}

/// Nearest whitespace-only line past `line`, or the first/last line.
fn block(buffer: &RopeBuffer, line: usize, direction: Direction) -> usize {
    let is_blank = |line: usize| buffer.line(line).iter().all(u8::is_ascii_whitespace);
    match direction {
        Direction::Forward => {
            let last = buffer.count_lines() - 1;
            (line + 1..=last).find(|&l| is_blank(l)).unwrap_or(last)
        }
        Direction::Backward => (0..line).rev().find(|&l| is_blank(l)).unwrap_or(0),
    }
}
