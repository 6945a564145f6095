use std::time::{Duration, Instant};

use ratatui::{
    buffer::Buffer,
    crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Paragraph, Widget},
    DefaultTerminal, Frame,
};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use crate::{
    display::{Display, Geometry, Screen},
    error::MonitorError,
};

/// Longest operator line accepted
const MAX_INPUT: usize = 80;
const LOG_ROWS: u16 = 8;

#[derive(Debug, Default)]
pub struct LogWidget;

impl Widget for &mut LogWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        TuiLoggerWidget::default()
            .block(Block::bordered().title("Log"))
            .style_error(Style::default().fg(Color::Red))
            .style_warn(Style::default().fg(Color::Yellow))
            .style_info(Style::default().fg(Color::Green))
            .style_debug(Style::default().fg(Color::White))
            .style_trace(Style::default().fg(Color::Magenta))
            .output_separator(':')
            .output_timestamp(Some("%H:%M:%S%.3f".to_string()))
            .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
            .output_target(false)
            .output_file(false)
            .output_line(false)
            .style(Style::default().fg(Color::White))
            .render(area, buf);
    }
}

/// Draws a [`Screen`] on the terminal, with the packet trace and the log
/// pane below the panels, and reads operator lines from the keyboard.
pub struct TerminalDisplay {
    terminal: DefaultTerminal,
    screen: Screen,
    input: String,
    log: LogWidget,
}

impl TerminalDisplay {
    pub fn new() -> Result<Self, MonitorError> {
        let terminal = ratatui::try_init()?;
        let area = restore_on_error(terminal.size(), ratatui::restore)?;
        Ok(Self {
            terminal,
            screen: Screen::new(area.height, area.width),
            input: String::new(),
            log: LogWidget,
        })
    }

    fn draw(&mut self) -> Result<(), MonitorError> {
        self.screen.set_input(&self.input);
        let screen = &self.screen;
        let log = &mut self.log;
        self.terminal
            .draw(|frame| draw(frame, screen, log))
            .map(|_| ())
            .map_err(MonitorError::from)
    }

    /// Applies one key press; returns a completed line.
    fn on_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<String> {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.clear();
                Some("q".to_string())
            },
            KeyCode::Enter => Some(std::mem::take(&mut self.input)),
            KeyCode::Backspace => {
                self.input.pop();
                None
            },
            KeyCode::Esc => {
                self.input.clear();
                None
            },
            KeyCode::Char(c) if self.input.chars().count() < MAX_INPUT => {
                self.input.push(c);
                None
            },
            _ => None,
        }
    }
}

fn draw(frame: &mut Frame, screen: &Screen, log: &mut LogWidget) {
    let panel_rows = screen.panel_rows();
    let [panels, trace, log_area] = Layout::vertical([
        Constraint::Length(panel_rows),
        Constraint::Min(3),
        Constraint::Length(LOG_ROWS),
    ])
    .areas(frame.area());

    let lines: Vec<Line> = screen.composite().into_iter().map(Line::from).collect();
    frame.render_widget(Paragraph::new(lines), panels);

    let visible = usize::from(trace.height.saturating_sub(2));
    let history: Vec<&str> = screen.trace_lines().collect();
    let tail = history[history.len().saturating_sub(visible)..]
        .iter()
        .map(|l| Line::from(*l))
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(tail).block(Block::bordered().title("Trace")),
        trace,
    );

    frame.render_widget(log, log_area);
}

impl Display for TerminalDisplay {
    fn size(&self) -> (u16, u16) {
        self.screen.size()
    }

    fn create_panel(&mut self, name: &'static str, geometry: Geometry) -> Result<(), MonitorError> {
        self.screen.create_panel(name, geometry)
    }

    fn put(&mut self, panel: &str, row: u16, col: u16, text: &str) -> Result<(), MonitorError> {
        self.screen.put(panel, row, col, text)
    }

    fn clear_row(&mut self, panel: &str, row: u16) -> Result<(), MonitorError> {
        self.screen.clear_row(panel, row)
    }

    fn raise(&mut self, panel: &str) -> Result<(), MonitorError> {
        self.screen.raise(panel)
    }

    fn status(&mut self, text: &str) {
        self.screen.status(text);
    }

    fn trace(&mut self, line: String) {
        self.screen.trace(line);
    }

    fn refresh(&mut self) -> Result<(), MonitorError> {
        let area = self.terminal.size()?;
        self.screen.resize(area.height, area.width);
        self.draw()
    }

    fn poll_line(&mut self, timeout: Duration) -> Result<Option<String>, MonitorError> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if !event::poll(left)? {
                return Ok(None);
            }
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(line) = self.on_key(key.code, key.modifiers) {
                        return Ok(Some(line));
                    }
                    self.draw()?;
                }
            }
            if left.is_zero() {
                return Ok(None);
            }
        }
    }
}

/// Runs `restore` when `result` failed, before the error is passed on.
fn restore_on_error<T, E>(result: Result<T, E>, restore: impl FnOnce()) -> Result<T, E> {
    if result.is_err() {
        restore();
    }
    result
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        ratatui::restore();
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, io};

    use super::*;

    #[test]
    fn terminal_is_restored_when_setup_fails() {
        let restored = Cell::new(0);
        let failed: io::Result<()> = Err(io::ErrorKind::Other.into());
        assert!(restore_on_error(failed, || restored.set(restored.get() + 1)).is_err());
        assert_eq!(restored.get(), 1);

        let ok = restore_on_error(io::Result::Ok(7), || restored.set(restored.get() + 1));
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(restored.get(), 1);
    }
}
