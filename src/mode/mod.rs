use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod command;
pub mod insert;
pub mod normal;

pub use command::CommandMode;
pub use insert::InsertMode;
pub use normal::NormalMode;

use crate::buffer::{Cursor, RopeBuffer};
use crate::config::Settings;
use crate::navigation::Motion;

/// Editor mode states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Command,
}

impl Mode {
    /// Returns a display string for the mode
    pub fn display(&self) -> &str {
        match self {
            Mode::Normal => "",
            Mode::Insert => "-- INSERT --",
            Mode::Command => "-- COMMAND --",
        }
    }
}

/// Context passed to mode handlers
pub struct EditorContext<'a> {
    pub buffer: &'a mut RopeBuffer,
    pub cursor: &'a mut Cursor,
    /// Column vertical motions aim for
    pub want_column: &'a mut usize,
    /// Byte offset of the anchor mark
    pub anchor: &'a mut usize,
    pub settings: &'a Settings,
    /// Lines moved by half-page motions
    pub half_page: usize,
}

impl EditorContext<'_> {
    pub fn apply(&mut self, motion: Motion) {
        *self.cursor = motion.apply(self.buffer, *self.cursor, self.want_column);
    }

    /// Replaces the cursor after an edit and re-anchors the wanted column.
    pub fn edited(&mut self, cursor: Cursor) {
        *self.cursor = cursor;
        *self.want_column = cursor.column();
    }
}

/// Result of handling an input event
#[derive(Debug, PartialEq, Eq)]
pub enum InputResult {
    /// Input was handled, continue
    Handled,
    /// Request mode change
    ModeSwitch(Mode),
    /// Request quit
    Quit,
    /// Input not handled, pass to next handler
    NotHandled,
    /// Display a message to the user
    Message(String),
    /// Switch to the buffer for a file, opening it if needed
    Open(PathBuf),
    /// Write the current buffer to a new file, then optionally quit
    SaveAs { path: PathBuf, quit: bool },
}

/// Trait for mode-specific input handlers
pub trait ModeHandler {
    fn handle_key(&mut self, key: KeyEvent, ctx: EditorContext) -> Result<InputResult>;
}
