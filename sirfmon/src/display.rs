//! Panel-addressed text display.
//!
//! Families write into named, bordered panels at fixed positions. [`Screen`]
//! keeps the panels as character grids; the terminal front end draws a
//! `Screen` and tests read it back.

use std::{collections::VecDeque, thread, time::Duration};

use unicode_width::UnicodeWidthChar;

use crate::error::MonitorError;

/// Lines kept for the trace panel
pub const TRACE_HISTORY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub rows: u16,
    pub cols: u16,
    pub top: u16,
    pub left: u16,
}

impl Geometry {
    pub const fn new(rows: u16, cols: u16, top: u16, left: u16) -> Self {
        Self {
            rows,
            cols,
            top,
            left,
        }
    }

    pub fn bottom(&self) -> u16 {
        self.top + self.rows
    }
}

pub trait Display {
    /// Terminal size as `(rows, cols)`
    fn size(&self) -> (u16, u16);

    fn create_panel(&mut self, name: &'static str, geometry: Geometry) -> Result<(), MonitorError>;

    /// Writes `text` at a panel-relative position; row and column 0 are the
    /// border. Text falling outside the panel is dropped.
    fn put(&mut self, panel: &str, row: u16, col: u16, text: &str) -> Result<(), MonitorError>;

    /// Blanks the inside of a panel row.
    fn clear_row(&mut self, panel: &str, row: u16) -> Result<(), MonitorError>;

    /// Brings a panel on top of the ones it overlaps.
    fn raise(&mut self, panel: &str) -> Result<(), MonitorError>;

    fn status(&mut self, text: &str);

    fn trace(&mut self, line: String);

    fn refresh(&mut self) -> Result<(), MonitorError>;

    /// Waits at most `timeout` for the operator to complete a line.
    fn poll_line(&mut self, timeout: Duration) -> Result<Option<String>, MonitorError>;
}

#[derive(Debug, Clone)]
struct Panel {
    name: &'static str,
    geometry: Geometry,
    cells: Vec<Vec<char>>,
}

// second half of a double-width character
const WIDE_TAIL: char = '\0';

impl Panel {
    fn new(name: &'static str, geometry: Geometry) -> Self {
        let rows = usize::from(geometry.rows);
        let cols = usize::from(geometry.cols);
        let mut cells = vec![vec![' '; cols]; rows];
        if rows >= 2 && cols >= 2 {
            for c in 1..cols - 1 {
                cells[0][c] = '─';
                cells[rows - 1][c] = '─';
            }
            for row in cells.iter_mut().take(rows - 1).skip(1) {
                row[0] = '│';
                row[cols - 1] = '│';
            }
            cells[0][0] = '┌';
            cells[0][cols - 1] = '┐';
            cells[rows - 1][0] = '└';
            cells[rows - 1][cols - 1] = '┘';
        }
        Self {
            name,
            geometry,
            cells,
        }
    }

    fn put(&mut self, row: u16, col: u16, text: &str) {
        let Some(line) = self.cells.get_mut(usize::from(row)) else {
            return;
        };
        let mut col = usize::from(col);
        for ch in text.chars() {
            let width = ch.width().unwrap_or(0);
            if width == 0 {
                continue;
            }
            if col + width > line.len() {
                break;
            }
            line[col] = ch;
            if width == 2 {
                line[col + 1] = WIDE_TAIL;
            }
            col += width;
        }
    }

    fn clear_row(&mut self, row: u16) {
        let Some(line) = self.cells.get_mut(usize::from(row)) else {
            return;
        };
        let cols = line.len();
        if cols > 2 {
            line[1..cols - 1].fill(' ');
        }
    }

    #[cfg(test)]
    fn row_text(&self, row: u16) -> Option<String> {
        self.cells
            .get(usize::from(row))
            .map(|line| line.iter().filter(|&&c| c != WIDE_TAIL).collect())
    }
}

/// In-memory display.
///
/// Operator input comes from a script: each queued entry is either a line
/// or an idle poll. An empty script sleeps for the timeout and yields
/// nothing.
#[derive(Debug, Clone)]
pub struct Screen {
    rows: u16,
    cols: u16,
    panels: Vec<Panel>,
    status: String,
    input: String,
    trace: VecDeque<String>,
    script: VecDeque<Option<String>>,
}

impl Screen {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            panels: Vec::new(),
            status: String::new(),
            input: String::new(),
            trace: VecDeque::new(),
            script: VecDeque::new(),
        }
    }

    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.rows = rows;
        self.cols = cols;
    }

    fn panel_mut(&mut self, name: &str) -> Result<&mut Panel, MonitorError> {
        self.panels
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| MonitorError::consistency(format!("no panel named {name}")))
    }

    fn panel(&self, name: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.name == name)
    }

    #[cfg(test)]
    pub fn row_text(&self, panel: &str, row: u16) -> Option<String> {
        self.panel(panel)?.row_text(row)
    }

    #[cfg(test)]
    pub fn panel_text(&self, panel: &str) -> Option<String> {
        let p = self.panel(panel)?;
        let rows: Vec<String> = (0..p.geometry.rows)
            .filter_map(|r| p.row_text(r))
            .collect();
        Some(rows.join("\n"))
    }

    #[cfg(test)]
    pub fn top_panel(&self) -> Option<&'static str> {
        self.panels.last().map(|p| p.name)
    }

    /// Rows taken by the panels, from the top of the screen.
    pub fn panel_rows(&self) -> u16 {
        self.panels
            .iter()
            .map(|p| p.geometry.bottom())
            .max()
            .unwrap_or(1)
    }

    pub fn trace_lines(&self) -> impl Iterator<Item = &str> {
        self.trace.iter().map(String::as_str)
    }

    #[cfg(test)]
    pub fn status_text(&self) -> &str {
        &self.status
    }

    /// The line being typed, shown after the prompt.
    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
    }

    #[cfg(test)]
    pub fn push_input(&mut self, line: &str) {
        self.script.push_back(Some(line.to_string()));
    }

    #[cfg(test)]
    pub fn push_idle(&mut self) {
        self.script.push_back(None);
    }

    #[cfg(test)]
    pub fn script_is_empty(&self) -> bool {
        self.script.is_empty()
    }

    /// The status line over all panels, bottom of the z-order first.
    pub fn composite(&self) -> Vec<String> {
        let height = usize::from(self.panel_rows());
        let width = usize::from(self.cols);
        let mut grid = vec![vec![' '; width]; height];

        let header = format!("{}  cmd> {}", self.status, self.input);
        for (cell, ch) in grid[0].iter_mut().zip(header.chars()) {
            *cell = ch;
        }

        for panel in &self.panels {
            let top = usize::from(panel.geometry.top);
            let left = usize::from(panel.geometry.left);
            for (r, line) in panel.cells.iter().enumerate() {
                let Some(dst) = grid.get_mut(top + r) else {
                    break;
                };
                for (c, &ch) in line.iter().enumerate() {
                    if let Some(cell) = dst.get_mut(left + c) {
                        *cell = ch;
                    }
                }
            }
        }

        grid.into_iter()
            .map(|line| line.into_iter().filter(|&c| c != WIDE_TAIL).collect())
            .collect()
    }
}

impl Display for Screen {
    fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    fn create_panel(&mut self, name: &'static str, geometry: Geometry) -> Result<(), MonitorError> {
        if self.panel(name).is_some() {
            return Err(MonitorError::consistency(format!("panel {name} created twice")));
        }
        self.panels.push(Panel::new(name, geometry));
        Ok(())
    }

    fn put(&mut self, panel: &str, row: u16, col: u16, text: &str) -> Result<(), MonitorError> {
        self.panel_mut(panel)?.put(row, col, text);
        Ok(())
    }

    fn clear_row(&mut self, panel: &str, row: u16) -> Result<(), MonitorError> {
        self.panel_mut(panel)?.clear_row(row);
        Ok(())
    }

    fn raise(&mut self, panel: &str) -> Result<(), MonitorError> {
        let idx = self
            .panels
            .iter()
            .position(|p| p.name == panel)
            .ok_or_else(|| MonitorError::consistency(format!("no panel named {panel}")))?;
        let p = self.panels.remove(idx);
        self.panels.push(p);
        Ok(())
    }

    fn status(&mut self, text: &str) {
        self.status = text.to_string();
    }

    fn trace(&mut self, line: String) {
        if self.trace.len() == TRACE_HISTORY {
            self.trace.pop_front();
        }
        self.trace.push_back(line);
    }

    fn refresh(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }

    fn poll_line(&mut self, timeout: Duration) -> Result<Option<String>, MonitorError> {
        match self.script.pop_front() {
            Some(entry) => Ok(entry),
            None => {
                thread::sleep(timeout);
                Ok(None)
            },
        }
    }
}
