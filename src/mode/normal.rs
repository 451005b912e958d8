use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::{EditorContext, InputResult, Mode, ModeHandler};
use crate::edit::EditOperations;
use crate::navigation::{Direction, LinePosition, Motion};

/// Normal mode handler - navigation and commands
#[derive(Debug, Default)]
pub struct NormalMode {
    /// First key of a two-key sequence such as `gg`
    pending: Option<char>,
}

impl NormalMode {
    pub fn new() -> Self {
        Self::default()
    }

    fn motion_for(&self, code: KeyCode) -> Option<Motion> {
        let motion = match code {
            KeyCode::Char('h') | KeyCode::Left => Motion::Char(Direction::Backward, 1),
            KeyCode::Char('l') | KeyCode::Right => Motion::Char(Direction::Forward, 1),
            KeyCode::Char('j') | KeyCode::Down => Motion::Line(Direction::Forward, 1),
            KeyCode::Char('k') | KeyCode::Up => Motion::Line(Direction::Backward, 1),
            KeyCode::Char('w') => Motion::Word(Direction::Forward),
            KeyCode::Char('b') => Motion::Word(Direction::Backward),
            KeyCode::Char('}') => Motion::Block(Direction::Forward),
            KeyCode::Char('{') => Motion::Block(Direction::Backward),
            KeyCode::Char('0') | KeyCode::Home => Motion::LinePosition(LinePosition::Start),
            KeyCode::Char('^') => Motion::LinePosition(LinePosition::FirstNonBlank),
            KeyCode::Char('$') | KeyCode::End => Motion::LinePosition(LinePosition::End),
            KeyCode::Char('G') => Motion::Document(Direction::Forward),
            _ => return None,
        };
        Some(motion)
    }
}

impl ModeHandler for NormalMode {
    fn handle_key(&mut self, key: KeyEvent, mut ctx: EditorContext) -> Result<InputResult> {
        if let Some(first) = self.pending.take() {
            if first == 'g' && key.code == KeyCode::Char('g') {
                ctx.apply(Motion::Document(Direction::Backward));
                return Ok(InputResult::Handled);
            }
            return Ok(InputResult::NotHandled);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('d') => {
                    ctx.apply(Motion::Line(Direction::Forward, ctx.half_page));
                    Ok(InputResult::Handled)
                }
                KeyCode::Char('u') => {
                    ctx.apply(Motion::Line(Direction::Backward, ctx.half_page));
                    Ok(InputResult::Handled)
                }
                KeyCode::Char('s') => save(&mut ctx),
                _ => Ok(InputResult::NotHandled),
            };
        }

        if let Some(motion) = self.motion_for(key.code) {
            ctx.apply(motion);
            return Ok(InputResult::Handled);
        }

        match key.code {
            KeyCode::Char('g') => {
                self.pending = Some('g');
                Ok(InputResult::Handled)
            }

            // Quit, refusing while there are unsaved changes
            KeyCode::Char('q') => {
                if ctx.buffer.is_modified() {
                    return Ok(InputResult::Message(
                        "No write since last change (use :q! to override)".to_string(),
                    ));
                }
                Ok(InputResult::Quit)
            }

            KeyCode::Char(':') => Ok(InputResult::ModeSwitch(Mode::Command)),

            // Enter insert mode commands
            KeyCode::Char('i') => Ok(InputResult::ModeSwitch(Mode::Insert)),
            KeyCode::Char('a') => {
                let line = ctx.cursor.line();
                let end = ctx.buffer.cursor_at_point(line, usize::MAX);
                if ctx.cursor.index < end.index {
                    ctx.apply(Motion::Char(Direction::Forward, 1));
                }
                Ok(InputResult::ModeSwitch(Mode::Insert))
            }
            KeyCode::Char('A') => {
                ctx.apply(Motion::LinePosition(LinePosition::End));
                Ok(InputResult::ModeSwitch(Mode::Insert))
            }
            KeyCode::Char('I') => {
                ctx.apply(Motion::LinePosition(LinePosition::FirstNonBlank));
                Ok(InputResult::ModeSwitch(Mode::Insert))
            }
            KeyCode::Char('o') => {
                let cursor = EditOperations::open_line_below(ctx.buffer, *ctx.cursor);
                ctx.edited(cursor);
                Ok(InputResult::ModeSwitch(Mode::Insert))
            }
            KeyCode::Char('O') => {
                let cursor = EditOperations::open_line_above(ctx.buffer, *ctx.cursor);
                ctx.edited(cursor);
                Ok(InputResult::ModeSwitch(Mode::Insert))
            }

            // Single-byte deletes
            KeyCode::Char('x') | KeyCode::Delete => {
                let cursor = EditOperations::delete_forward(ctx.buffer, *ctx.cursor);
                ctx.edited(cursor);
                Ok(InputResult::Handled)
            }
            KeyCode::Char('X') => {
                let cursor = EditOperations::backspace(ctx.buffer, *ctx.cursor);
                ctx.edited(cursor);
                Ok(InputResult::Handled)
            }

            // Anchor
            KeyCode::Char('m') => {
                *ctx.anchor = ctx.cursor.index;
                Ok(InputResult::Message("Anchor placed".to_string()))
            }
            KeyCode::Char('\'') => {
                let anchor = *ctx.anchor;
                let cursor = ctx.buffer.cursor_at(anchor);
                *ctx.anchor = ctx.cursor.index;
                ctx.edited(cursor);
                Ok(InputResult::Handled)
            }

            _ => Ok(InputResult::NotHandled),
        }
    }
}

pub(crate) fn save(ctx: &mut EditorContext) -> Result<InputResult> {
    ctx.buffer.save(&ctx.settings.save_options())?;
    let name = ctx
        .buffer
        .path()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    Ok(InputResult::Message(format!(
        "\"{}\" {}L, {}B written",
        name,
        ctx.buffer.count_lines(),
        ctx.buffer.len()
    )))
}
