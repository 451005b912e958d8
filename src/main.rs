use std::io::{stdout, Stdout};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use cordage::mode::{
    CommandMode, EditorContext, InputResult, InsertMode, Mode, ModeHandler, NormalMode,
};
use cordage::ui::{display_column, expand_tabs, Viewport};
use cordage::{BufferId, BufferManager, Cli, Cursor, RopeBuffer, Settings};

struct App {
    should_quit: bool,
    manager: BufferManager,
    current: BufferId,
    cursor: Cursor,
    want_column: usize,
    anchor: usize,
    /// Cursor offsets of buffers that are not on screen
    positions: FxHashMap<BufferId, usize>,
    mode: Mode,
    normal: NormalMode,
    insert: InsertMode,
    command: CommandMode,
    viewport: Viewport,
    settings: Settings,
    message: Option<String>,
}

impl App {
    fn new(settings: Settings, file: Option<&Path>) -> Result<Self> {
        let mut manager = BufferManager::new();
        let current = match file {
            Some(path) => manager.get_or_open(path),
            None => manager.create(),
        };
        let cursor = manager
            .get(current)
            .context("buffer missing right after opening")?
            .cursor_at(0);
        Ok(Self {
            should_quit: false,
            manager,
            current,
            cursor,
            want_column: 0,
            anchor: 0,
            positions: FxHashMap::default(),
            mode: Mode::Normal,
            normal: NormalMode::new(),
            insert: InsertMode::new(),
            command: CommandMode::new(),
            viewport: Viewport::new(0, 40),
            settings,
            message: None,
        })
    }

    fn buffer(&self) -> Result<&RopeBuffer> {
        self.manager.get(self.current).context("current buffer was closed")
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        if let Event::Key(key) = event {
            if key.kind == KeyEventKind::Press {
                self.handle_key(key)?;
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        self.message = None;
        let buffer = self
            .manager
            .get_mut(self.current)
            .context("current buffer was closed")?;
        let ctx = EditorContext {
            buffer,
            cursor: &mut self.cursor,
            want_column: &mut self.want_column,
            anchor: &mut self.anchor,
            settings: &self.settings,
            half_page: self.viewport.half_page(),
        };

        let result = match self.mode {
            Mode::Normal => self.normal.handle_key(key, ctx),
            Mode::Insert => self.insert.handle_key(key, ctx),
            Mode::Command => self.command.handle_key(key, ctx),
        };

        match result {
            Ok(result) => self.apply(result),
            Err(err) => {
                warn!("{err:#}");
                self.message = Some(format!("{err:#}"));
                if self.mode == Mode::Command {
                    self.mode = Mode::Normal;
                }
                Ok(())
            }
        }
    }

    fn apply(&mut self, result: InputResult) -> Result<()> {
        match result {
            InputResult::Handled | InputResult::NotHandled => {}
            InputResult::ModeSwitch(mode) => self.mode = mode,
            InputResult::Quit => self.should_quit = true,
            InputResult::Message(message) => {
                self.message = Some(message);
                if self.mode == Mode::Command {
                    self.mode = Mode::Normal;
                }
            }
            InputResult::Open(path) => {
                self.mode = Mode::Normal;
                let id = self.manager.get_or_open(&path);
                self.switch_to(id)?;
                self.message = Some(format!("\"{}\"", path.display()));
            }
            InputResult::SaveAs { path, quit } => {
                self.mode = Mode::Normal;
                let options = self.settings.save_options();
                match self.manager.save_as(self.current, &path, &options) {
                    Ok(()) => {
                        self.message = Some(format!("\"{}\" written", path.display()));
                        self.should_quit = quit;
                    }
                    Err(err) => {
                        warn!("{err}");
                        self.message = Some(err.to_string());
                    }
                }
            }
        }
        Ok(())
    }

    fn switch_to(&mut self, id: BufferId) -> Result<()> {
        if id == self.current {
            return Ok(());
        }
        self.positions.insert(self.current, self.cursor.index);
        self.current = id;
        let index = self.positions.get(&id).copied().unwrap_or(0);
        self.cursor = self.buffer()?.cursor_at(index);
        self.want_column = self.cursor.column();
        self.anchor = 0;
        self.viewport.start_line = 0;
        info!(buffers = self.manager.len(), "switched buffer");
        Ok(())
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.show_cursor()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn render_ui(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let buffer = app
        .manager
        .get(app.current)
        .context("current buffer was closed")?;
    let tab_width = app.settings.tab_width;

    terminal.draw(|frame| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let file_name = buffer
            .path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "[No Name]".to_string());
        let main_block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", file_name));
        let inner_area = main_block.inner(chunks[0]);
        frame.render_widget(main_block, chunks[0]);

        app.viewport.resize(inner_area.height as usize);
        app.viewport
            .scroll_to(app.cursor.line(), app.settings.scroll_margin);

        let last_line = app.viewport.end_line().min(buffer.count_lines());
        let lines: Vec<Line> = (app.viewport.start_line..last_line)
            .map(|line| Line::from(expand_tabs(&buffer.line(line), tab_width)))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner_area);

        // Status bar
        let modified = if buffer.is_modified() { " [+]" } else { "" };
        let status_text = format!(
            " {}{} ({}) | {}:{} | {} lines | {}",
            file_name,
            modified,
            format_size(buffer.len()),
            app.cursor.line() + 1,
            app.cursor.column() + 1,
            buffer.count_lines(),
            app.mode.display(),
        );
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        frame.render_widget(status, chunks[1]);

        let command_text = match app.mode {
            Mode::Command => format!(":{}", app.command.command_line),
            _ => app.message.clone().unwrap_or_default(),
        };
        frame.render_widget(Paragraph::new(command_text), chunks[2]);

        if app.mode == Mode::Command {
            let x = chunks[2].x + 1 + app.command.command_line.chars().count() as u16;
            frame.set_cursor_position((x, chunks[2].y));
        } else {
            let line = buffer.line(app.cursor.line());
            let column = display_column(&line, app.cursor.column(), tab_width);
            let row = app.cursor.line() - app.viewport.start_line;
            let x = inner_area.x + (column as u16).min(inner_area.width.saturating_sub(1));
            let y = inner_area.y + (row as u16).min(inner_area.height.saturating_sub(1));
            frame.set_cursor_position((x, y));
        }
    })?;

    Ok(())
}

fn run(mut app: App, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    loop {
        render_ui(terminal, &mut app)?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(250))? {
            let event = event::read()?;
            app.handle_event(event)?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log = cordage::log::init(cli.log_file.clone())
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;
    info!(log_file = %log.log_file.display(), "cordage starting");

    let mut settings = Settings::load();
    settings.apply(&cli);

    // Set up panic hook to restore terminal
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
        default_panic(info);
    }));

    let app = App::new(settings, cli.file.as_deref())?;

    let mut terminal = setup_terminal()?;
    let result = run(app, &mut terminal);
    restore_terminal(terminal)?;

    result
}
