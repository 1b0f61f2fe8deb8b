//! Ratatui-based operator console.
//!
//! Talks to a running desk server through [`DeskClient`]. Three tabs: the
//! latest dataset of one type (mark points normal/anomaly/fixed), the review
//! queue (approve/reject pending batches), and the pull tasks (start/stop).
//! Request failures never exit the console; they land in the status line and
//! `r` retries.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState, Tabs},
};
use tracing::{info, warn};

use crate::client::DeskClient;
use crate::domain::{
    DataPoint, DataStatus, DataType, PullTask, ReviewStatus, ReviewTask, TaskStatus,
};
use crate::error::AppError;
use crate::review::ReviewCounts;

const AUTO_RELOAD: Duration = Duration::from_secs(5);

/// Start the console.
pub fn run(client: DeskClient) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(client);
    app.reload();
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Data,
    Reviews,
    Tasks,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Data, Tab::Reviews, Tab::Tasks];

    fn title(self) -> &'static str {
        match self {
            Tab::Data => "Data",
            Tab::Reviews => "Reviews",
            Tab::Tasks => "Tasks",
        }
    }

    fn next(self) -> Self {
        match self {
            Tab::Data => Tab::Reviews,
            Tab::Reviews => Tab::Tasks,
            Tab::Tasks => Tab::Data,
        }
    }

    fn index(self) -> usize {
        match self {
            Tab::Data => 0,
            Tab::Reviews => 1,
            Tab::Tasks => 2,
        }
    }
}

struct App {
    client: DeskClient,
    tab: Tab,
    kind: DataType,
    data: Vec<DataPoint>,
    reviews: Vec<ReviewTask>,
    counts: ReviewCounts,
    tasks: Vec<PullTask>,
    selected: usize,
    status: String,
    failed: bool,
    last_reload: Instant,
}

impl App {
    fn new(client: DeskClient) -> Self {
        Self {
            status: format!("Connecting to {}...", client.base_url()),
            client,
            tab: Tab::Data,
            kind: DataType::Industry,
            data: Vec::new(),
            reviews: Vec::new(),
            counts: ReviewCounts::default(),
            tasks: Vec::new(),
            selected: 0,
            failed: false,
            last_reload: Instant::now(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            // Failed fetches wait for an explicit retry.
            if !self.failed && self.last_reload.elapsed() >= AUTO_RELOAD {
                self.reload();
                needs_redraw = true;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the console should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                self.tab = self.tab.next();
                self.selected = 0;
                self.reload();
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = clamp_selection(self.selected + 1, self.row_count()),
            _ => self.handle_tab_key(code),
        }
        false
    }

    fn handle_tab_key(&mut self, code: KeyCode) {
        match (self.tab, code) {
            (Tab::Data, KeyCode::Char('t')) => {
                self.kind = self.kind.next();
                self.selected = 0;
                self.reload();
            }
            (Tab::Data, KeyCode::Char('n')) => self.mark(DataStatus::Normal),
            (Tab::Data, KeyCode::Char('a')) => self.mark(DataStatus::Anomaly),
            (Tab::Data, KeyCode::Char('f')) => self.mark(DataStatus::Fixed),
            (Tab::Reviews, KeyCode::Char('a')) => self.decide_review(true),
            (Tab::Reviews, KeyCode::Char('x')) => self.decide_review(false),
            (Tab::Tasks, KeyCode::Char('s')) => self.toggle_task(true),
            (Tab::Tasks, KeyCode::Char('p')) => self.toggle_task(false),
            _ => {}
        }
    }

    fn row_count(&self) -> usize {
        match self.tab {
            Tab::Data => self.data.len(),
            Tab::Reviews => self.reviews.len(),
            Tab::Tasks => self.tasks.len(),
        }
    }

    /// Fetch the current tab's rows.
    fn reload(&mut self) {
        self.last_reload = Instant::now();
        let outcome = match self.tab {
            Tab::Data => self.client.fetch_data(self.kind).map(|data| {
                self.data = data;
                format!("{} points for {}", self.data.len(), self.kind.display_name())
            }),
            Tab::Reviews => self.client.list_reviews().map(|body| {
                self.reviews = body.reviews;
                self.counts = body.counts;
                format!(
                    "{} pending, {} approved, {} rejected",
                    self.counts.pending, self.counts.approved, self.counts.rejected
                )
            }),
            Tab::Tasks => self.client.list_tasks().map(|tasks| {
                self.tasks = tasks;
                format!("{} tasks", self.tasks.len())
            }),
        };

        match outcome {
            Ok(status) => {
                self.failed = false;
                self.status = status;
            }
            Err(err) => self.fail(err),
        }
        self.selected = clamp_selection(self.selected, self.row_count());
    }

    fn fail(&mut self, err: AppError) {
        warn!("console request failed: {err}");
        self.failed = true;
        self.status = format!("{err} (r to retry)");
    }

    fn mark(&mut self, status: DataStatus) {
        let Some(point) = self.data.get(self.selected) else {
            return;
        };
        let id = point.id.clone();
        match self.client.update_status(&id, status) {
            Ok(()) => {
                info!(id = %id, status = status.as_str(), "marked data point");
                self.reload();
                self.status = format!("Marked {id} as {}", status.as_str());
            }
            Err(err) => self.fail(err),
        }
    }

    fn decide_review(&mut self, approve: bool) {
        let Some(review) = self.reviews.get(self.selected) else {
            return;
        };
        if review.status != ReviewStatus::Pending {
            self.status = format!("Review {} is already {}", review.id, review.status.as_str());
            return;
        }
        let id = review.id.clone();
        let result = if approve {
            self.client.approve(&id, HashMap::new())
        } else {
            self.client.reject(&id, None)
        };
        match result {
            Ok(reviewed) => {
                self.reload();
                self.status = format!("Review {id} {}", reviewed.status.as_str());
            }
            Err(err) => self.fail(err),
        }
    }

    fn toggle_task(&mut self, start: bool) {
        let Some(task) = self.tasks.get(self.selected) else {
            return;
        };
        let id = task.id.clone();
        let result = if start {
            self.client.start_task(&id)
        } else {
            self.client.stop_task(&id)
        };
        match result {
            Ok(task) => {
                self.reload();
                self.status = format!("{} is {}", task.name, task.status.as_str());
            }
            Err(err) => self.fail(err),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_tabs(frame, chunks[0]);
        match self.tab {
            Tab::Data => self.draw_data(frame, chunks[1]),
            Tab::Reviews => self.draw_reviews(frame, chunks[1]),
            Tab::Tasks => self.draw_tasks(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_tabs(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("refdesk @ {}", self.client.base_url())),
            )
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, area);
    }

    fn draw_data(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = self.data.iter().map(|p| Row::new(data_cells(p)).style(data_style(p.status)));
        let table = Table::new(
            rows,
            [
                Constraint::Length(11),
                Constraint::Length(8),
                Constraint::Min(16),
                Constraint::Length(10),
                Constraint::Length(8),
            ],
        )
        .header(header(["Date", "Symbol", "Name", "Value", "Status"]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(self.kind.display_name()),
        );
        self.render_table(frame, area, table);
    }

    fn draw_reviews(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = self.reviews.iter().map(|r| Row::new(review_cells(r)));
        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Length(10),
                Constraint::Length(6),
                Constraint::Length(9),
                Constraint::Length(9),
                Constraint::Length(17),
            ],
        )
        .header(header(["Task", "Type", "Rows", "Abnormal", "Status", "Created"]))
        .block(Block::default().borders(Borders::ALL).title("Review queue"));
        self.render_table(frame, area, table);
    }

    fn draw_tasks(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = self.tasks.iter().map(|t| Row::new(task_cells(t)));
        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(17),
            ],
        )
        .header(header(["Task", "Type", "Status", "Progress", "Last run"]))
        .block(Block::default().borders(Borders::ALL).title("Pull tasks"));
        self.render_table(frame, area, table);
    }

    fn render_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect, table: Table<'_>) {
        let table = table
            .row_highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");
        let mut state = TableState::default();
        if self.row_count() > 0 {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = match self.tab {
            Tab::Data => "Tab switch  t type  n/a/f mark  r reload  q quit",
            Tab::Reviews => "Tab switch  a approve  x reject  r reload  q quit",
            Tab::Tasks => "Tab switch  s start  p stop  r reload  q quit",
        };
        let status_color = if self.failed { Color::Red } else { Color::Yellow };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(status_color)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn header<const N: usize>(titles: [&'static str; N]) -> Row<'static> {
    Row::new(titles).style(Style::default().add_modifier(Modifier::BOLD))
}

fn clamp_selection(selected: usize, rows: usize) -> usize {
    selected.min(rows.saturating_sub(1))
}

fn data_style(status: DataStatus) -> Style {
    match status {
        DataStatus::Normal => Style::default(),
        DataStatus::Anomaly => Style::default().fg(Color::Red),
        DataStatus::Fixed => Style::default().fg(Color::Green),
    }
}

fn data_cells(point: &DataPoint) -> Vec<String> {
    vec![
        point.timestamp.to_string(),
        point.data.symbol().to_string(),
        point.data.name().to_string(),
        point
            .data
            .headline()
            .map_or_else(|| "-".to_string(), |v| format!("{v:.2}")),
        point.status.as_str().to_string(),
    ]
}

fn review_cells(review: &ReviewTask) -> Vec<String> {
    let abnormal = review.data.iter().filter(|i| i.is_abnormal).count();
    vec![
        review.task_name.clone(),
        review.kind.display_name().to_string(),
        review.data.len().to_string(),
        abnormal.to_string(),
        review.status.as_str().to_string(),
        review.created_at.format("%Y-%m-%d %H:%M").to_string(),
    ]
}

fn task_cells(task: &PullTask) -> Vec<String> {
    let progress = match (&task.progress, task.status) {
        (Some(p), TaskStatus::Running) => format!("{}/{}", p.current, p.total),
        _ => "-".to_string(),
    };
    vec![
        task.name.clone(),
        task.kind.display_name().to_string(),
        task.status.as_str().to_string(),
        progress,
        task.last_run
            .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
    ]
}
