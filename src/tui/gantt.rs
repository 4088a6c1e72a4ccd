//! Read-only Gantt chart of a project.
//!
//! One row per task in task-number order, one column per day (or per week
//! when zoomed out). Bars are drawn from the planned dates; the filled part
//! of a bar follows the recorded progress.

use std::io;
use std::time::Duration;

use chrono::{Duration as Days, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use crate::db::{format_date, truncate, Database};
use crate::fields::{format_status, SortKey, Status};
use crate::task::TaskNo;
use crate::tui::colors::{status_color, DARK_PURPLE, TODAY};

const LABEL_WIDTH: usize = 34;
const SCALE_STEP: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct GanttRow {
    pub task_no: TaskNo,
    pub name: String,
    pub milestone: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub progress: u8,
    pub status: Status,
    pub excluded: bool,
}

pub struct GanttApp {
    project_name: String,
    rows: Vec<GanttRow>,
    origin: NaiveDate,
    today: NaiveDate,
    selected: usize,
    row_offset: usize,
    /// Days between `origin` and the first visible column.
    day_offset: i64,
    days_per_cell: i64,
    show_excluded: bool,
    status_message: String,
}

/// Inclusive range of cells a date span covers, clipped to `width` cells
/// starting at `first`. `None` when the span is entirely off screen.
pub fn bar_cells(
    start: NaiveDate,
    end: NaiveDate,
    first: NaiveDate,
    days_per_cell: i64,
    width: usize,
) -> Option<(usize, usize)> {
    if width == 0 || end < start {
        return None;
    }
    let from = (start - first).num_days().div_euclid(days_per_cell);
    let to = (end - first).num_days().div_euclid(days_per_cell);
    let last = width as i64 - 1;
    if to < 0 || from > last {
        return None;
    }
    Some((from.max(0) as usize, to.min(last) as usize))
}

impl GanttApp {
    pub fn new(project_name: &str, db: &Database, today: NaiveDate) -> Self {
        let rows: Vec<GanttRow> = db
            .sorted_tasks(SortKey::No)
            .into_iter()
            .map(|t| GanttRow {
                task_no: t.task_no,
                name: t.name.clone(),
                milestone: t.milestone.clone(),
                start: t.start_date,
                end: t.end_date,
                progress: t.progress,
                status: t.status,
                excluded: t.excluded,
            })
            .collect();
        let origin = rows.iter().filter_map(|r| r.start).min().unwrap_or(today);
        GanttApp {
            project_name: project_name.to_string(),
            rows,
            origin,
            today,
            selected: 0,
            row_offset: 0,
            day_offset: 0,
            days_per_cell: 1,
            show_excluded: true,
            status_message: String::new(),
        }
    }

    fn visible_rows(&self) -> Vec<&GanttRow> {
        self.rows
            .iter()
            .filter(|r| self.show_excluded || !r.excluded)
            .collect()
    }

    fn first_date(&self) -> NaiveDate {
        self.origin + Days::days(self.day_offset)
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_rows().len();
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
    }

    /// Apply one key press. Returns true when the view should close.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        self.status_message.clear();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected += 1;
                self.clamp_selection();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::PageDown => {
                self.selected += 10;
                self.clamp_selection();
            }
            KeyCode::PageUp => {
                self.selected = self.selected.saturating_sub(10);
            }
            KeyCode::Right | KeyCode::Char('l') => self.day_offset += 7 * self.days_per_cell,
            KeyCode::Left | KeyCode::Char('h') => self.day_offset -= 7 * self.days_per_cell,
            KeyCode::Char('+') => {
                self.days_per_cell = 1;
                self.status_message = "Zoom: days".to_string();
            }
            KeyCode::Char('-') => {
                self.days_per_cell = 7;
                self.status_message = "Zoom: weeks".to_string();
            }
            KeyCode::Char('t') => {
                self.day_offset = (self.today - self.origin).num_days() - 2 * self.days_per_cell;
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.day_offset = 0;
                self.selected = 0;
            }
            KeyCode::Char('x') => {
                self.show_excluded = !self.show_excluded;
                self.clamp_selection();
                self.status_message = if self.show_excluded {
                    "Showing excluded tasks".to_string()
                } else {
                    "Hiding excluded tasks".to_string()
                };
            }
            _ => {}
        }
        false
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code));
                }
            }
        }
        Ok(false)
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Chart
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_chart(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let zoom = if self.days_per_cell == 1 { "days" } else { "weeks" };
        let line = Line::from(vec![
            Span::styled("GANTT", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("Project: {}", self.project_name),
                Style::default().fg(DARK_PURPLE).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  Zoom: {}  From: {}", zoom, self.first_date())),
        ]);
        let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        f.render_widget(header, area);
    }

    fn scale_line(&self, width: usize) -> Line<'static> {
        let mut chars = vec![' '; width];
        for cell in (0..width).step_by(SCALE_STEP) {
            let date = self.first_date() + Days::days(cell as i64 * self.days_per_cell);
            for (i, c) in date.format("%m-%d").to_string().chars().enumerate() {
                if let Some(slot) = chars.get_mut(cell + i) {
                    *slot = c;
                }
            }
        }
        Line::from(vec![
            Span::raw(" ".repeat(LABEL_WIDTH)),
            Span::styled(chars.into_iter().collect::<String>(), Style::default().fg(Color::Gray)),
        ])
    }

    fn row_line(&self, row: &GanttRow, selected: bool, width: usize) -> Line<'static> {
        let label = format!("{:<6}{}", row.task_no.to_string(), row.name);
        let mut label_style = Style::default();
        if selected {
            label_style = label_style.add_modifier(Modifier::REVERSED);
        }
        if row.excluded {
            label_style = label_style.fg(Color::DarkGray);
        }
        let mut spans = vec![Span::styled(
            format!("{:<width$}", truncate(&label, LABEL_WIDTH - 1), width = LABEL_WIDTH),
            label_style,
        )];

        let first = self.first_date();
        let (start, end) = match (row.start, row.end) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                spans.push(Span::styled("unscheduled", Style::default().fg(Color::DarkGray)));
                return Line::from(spans);
            }
        };
        let color = if row.excluded { Color::DarkGray } else { status_color(row.status) };
        let today_cell = bar_cells(self.today, self.today, first, self.days_per_cell, width);

        let mut cells = vec![Span::raw(" "); width];
        if let Some((t, _)) = today_cell {
            cells[t] = Span::styled("│", Style::default().fg(TODAY));
        }
        if let Some((from, to)) = bar_cells(start, end, first, self.days_per_cell, width) {
            // The filled part is measured against the whole bar, not the clipped one.
            let bar_origin = (start - first).num_days().div_euclid(self.days_per_cell);
            let bar_end = (end - first).num_days().div_euclid(self.days_per_cell);
            let filled = ((bar_end - bar_origin + 1) * i64::from(row.progress) + 99) / 100;
            for (i, cell) in cells.iter_mut().enumerate().take(to + 1).skip(from) {
                let done = (i as i64 - bar_origin) < filled;
                let glyph = if done { "█" } else { "░" };
                *cell = Span::styled(glyph, Style::default().fg(color));
            }
        }
        spans.extend(cells);
        Line::from(spans)
    }

    fn render_chart(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Timeline");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let width = (inner.width as usize).saturating_sub(LABEL_WIDTH);
        let height = (inner.height as usize).saturating_sub(1);
        if height > 0 {
            if self.selected < self.row_offset {
                self.row_offset = self.selected;
            } else if self.selected >= self.row_offset + height {
                self.row_offset = self.selected + 1 - height;
            }
        }

        let rows = self.visible_rows();
        let mut lines = vec![self.scale_line(width)];
        if rows.is_empty() {
            lines.push(Line::from(Span::styled(
                "No tasks. Add some with `plan task add`.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for (i, row) in rows.iter().enumerate().skip(self.row_offset).take(height) {
            lines.push(self.row_line(row, i == self.selected, width));
        }
        f.render_widget(Paragraph::new(lines), inner);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if let Some(row) = self.visible_rows().get(self.selected) {
            format!(
                "{} {} | {} | {} .. {} | {}% {} | q quit  ←/→ scroll  +/- zoom  t today  x excluded",
                row.task_no,
                row.name,
                row.milestone,
                format_date(row.start),
                format_date(row.end),
                row.progress,
                format_status(row.status)
            )
        } else {
            "q quit".to_string()
        };
        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::White).bg(Color::DarkGray)),
            area,
        );
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
