use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::normal::save;
use super::{EditorContext, InputResult, Mode, ModeHandler};

/// Command mode handler - ex-style commands
#[derive(Debug, Default)]
pub struct CommandMode {
    /// Current command being typed
    pub command_line: String,
}

impl CommandMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a command
    fn execute_command(&mut self, cmd: &str, ctx: &mut EditorContext) -> Result<InputResult> {
        let cmd = cmd.trim();
        let (name, argument) = match cmd.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, Some(argument.trim()).filter(|a| !a.is_empty())),
            None => (cmd, None),
        };

        match (name, argument) {
            ("w" | "write", Some(path)) => Ok(InputResult::SaveAs {
                path: PathBuf::from(path),
                quit: false,
            }),
            ("wq" | "x", Some(path)) => Ok(InputResult::SaveAs {
                path: PathBuf::from(path),
                quit: true,
            }),
            ("e" | "edit", Some(path)) => Ok(InputResult::Open(PathBuf::from(path))),
            ("e" | "edit", None) => Ok(InputResult::Message("Argument required".to_string())),

            ("q" | "quit", None) => {
                if ctx.buffer.is_modified() {
                    return Ok(InputResult::Message(
                        "No write since last change (use :q! to override)".to_string(),
                    ));
                }
                Ok(InputResult::Quit)
            }
            ("q!" | "quit!", None) => Ok(InputResult::Quit),
            ("w" | "write", None) => save(ctx),
            ("wq", None) => {
                save(ctx)?;
                Ok(InputResult::Quit)
            }
            // Like :wq, but only writes when there is something to write
            ("x", None) => {
                if ctx.buffer.is_modified() {
                    save(ctx)?;
                }
                Ok(InputResult::Quit)
            }
            ("", None) => Ok(InputResult::ModeSwitch(Mode::Normal)),
            _ => Ok(InputResult::Message(format!("Unknown command: {}", cmd))),
        }
    }
}

impl ModeHandler for CommandMode {
    fn handle_key(&mut self, key: KeyEvent, mut ctx: EditorContext) -> Result<InputResult> {
        match (key.code, key.modifiers) {
            // Escape - cancel command mode
            (KeyCode::Esc, _) => {
                self.command_line.clear();
                Ok(InputResult::ModeSwitch(Mode::Normal))
            }

            // Enter - execute command
            (KeyCode::Enter, _) => {
                let cmd = std::mem::take(&mut self.command_line);
                self.execute_command(&cmd, &mut ctx)
            }

            // Backspace on an empty line leaves command mode
            (KeyCode::Backspace, _) => {
                if self.command_line.pop().is_none() {
                    return Ok(InputResult::ModeSwitch(Mode::Normal));
                }
                Ok(InputResult::Handled)
            }

            (KeyCode::Char(c), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
                self.command_line.push(c);
                Ok(InputResult::Handled)
            }

            _ => Ok(InputResult::NotHandled),
        }
    }
}
