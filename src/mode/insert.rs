use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::normal::save;
use super::{EditorContext, InputResult, Mode, ModeHandler};
use crate::edit::EditOperations;
use crate::navigation::{Direction, Motion};

/// Insert mode handler - text editing
#[derive(Debug, Default)]
pub struct InsertMode;

impl InsertMode {
    pub fn new() -> Self {
        Self
    }
}

impl ModeHandler for InsertMode {
    fn handle_key(&mut self, key: KeyEvent, mut ctx: EditorContext) -> Result<InputResult> {
        match (key.code, key.modifiers) {
            // Exit insert mode, leaving the cursor on the last inserted byte
            (KeyCode::Esc, _) => {
                if ctx.cursor.column() > 0 {
                    ctx.apply(Motion::Char(Direction::Backward, 1));
                }
                Ok(InputResult::ModeSwitch(Mode::Normal))
            }

            (KeyCode::Char('s'), KeyModifiers::CONTROL) => save(&mut ctx),

            (KeyCode::Char(c), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
                let cursor = EditOperations::insert_char(ctx.buffer, *ctx.cursor, c);
                ctx.edited(cursor);
                Ok(InputResult::Handled)
            }

            (KeyCode::Enter, _) => {
                let cursor = EditOperations::newline(ctx.buffer, *ctx.cursor);
                ctx.edited(cursor);
                Ok(InputResult::Handled)
            }

            (KeyCode::Tab, _) => {
                let width = ctx.settings.tab_width;
                let cursor = EditOperations::tab(ctx.buffer, *ctx.cursor, width);
                ctx.edited(cursor);
                Ok(InputResult::Handled)
            }

            (KeyCode::Backspace, _) => {
                let cursor = EditOperations::backspace(ctx.buffer, *ctx.cursor);
                ctx.edited(cursor);
                Ok(InputResult::Handled)
            }

            (KeyCode::Delete, _) => {
                let cursor = EditOperations::delete_forward(ctx.buffer, *ctx.cursor);
                ctx.edited(cursor);
                Ok(InputResult::Handled)
            }

            // Arrow keys (allow navigation in insert mode)
            (KeyCode::Left, _) => {
                ctx.apply(Motion::Char(Direction::Backward, 1));
                Ok(InputResult::Handled)
            }
            (KeyCode::Right, _) => {
                ctx.apply(Motion::Char(Direction::Forward, 1));
                Ok(InputResult::Handled)
            }
            (KeyCode::Up, _) => {
                ctx.apply(Motion::Line(Direction::Backward, 1));
                Ok(InputResult::Handled)
            }
            (KeyCode::Down, _) => {
                ctx.apply(Motion::Line(Direction::Forward, 1));
                Ok(InputResult::Handled)
            }

            _ => Ok(InputResult::NotHandled),
        }
    }
}
