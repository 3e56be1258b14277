use anyhow::Result;
use chrono::{Datelike, Days, Months, NaiveDate};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;

use crate::config;
use crate::database::Database;
use crate::models::{Category, ConfigItem, NewTask, PopupMode, Priority, Status, Task, TaskUpdate, User};
use crate::query::{self, Query, QuickFilter, SortKey, StructuredFilter};
use crate::stats::{self, Stats};
use crate::store::TaskStore;

const TAB_TITLES: [&str; 4] = ["Tasks", "Analytics", "Calendar", "Configs"];
const TASKS_TAB: usize = 0;
const ANALYTICS_TAB: usize = 1;
const CALENDAR_TAB: usize = 2;
const CONFIGS_TAB: usize = 3;

/// Every structured filter the filter popup offers, in display order.
fn structured_options() -> Vec<StructuredFilter> {
    let mut options: Vec<StructuredFilter> = Category::ALL.into_iter().map(StructuredFilter::Category).collect();
    options.extend(Priority::ALL.into_iter().rev().map(StructuredFilter::Priority));
    options.extend(Status::ALL.into_iter().map(StructuredFilter::Status));
    options.push(StructuredFilter::Completed);
    options.push(StructuredFilter::Archived);
    options
}

/// Quick filters cycle none -> today -> important -> upcoming -> none.
fn next_quick_filter(current: Option<QuickFilter>) -> Option<QuickFilter> {
    match current {
        None => Some(QuickFilter::Today),
        Some(QuickFilter::Today) => Some(QuickFilter::Important),
        Some(QuickFilter::Important) => Some(QuickFilter::Upcoming),
        Some(QuickFilter::Upcoming) | Some(QuickFilter::DateEquals(_)) => None,
    }
}

fn step_selection(state: &mut ListState, len: usize, forward: bool) {
    if len == 0 {
        state.select(None);
        return;
    }
    let i = match state.selected() {
        Some(i) if forward => {
            if i + 1 >= len {
                0
            } else {
                i + 1
            }
        }
        Some(i) => {
            if i == 0 {
                len - 1
            } else {
                i - 1
            }
        }
        None => 0,
    };
    state.select(Some(i));
}

fn clamp_selection(state: &mut ListState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        None => state.select(Some(0)),
        Some(_) => {}
    }
}

pub struct App {
    db: Database,
    user: User,
    today: NaiveDate,
    pub current_tab: usize,
    pub tasks: Vec<Task>,
    /// `tasks` after the current query.
    pub visible: Vec<Task>,
    pub configs: Vec<ConfigItem>,
    pub stats: Stats,
    pub query: Query,
    pub task_list_state: ListState,
    pub config_list_state: ListState,
    pub filter_list_state: ListState,
    pub selected_day: NaiveDate,
    pub should_quit: bool,
    // UI state
    pub input_buffer: String,
    pub config_value_buffer: String,
    pub popup_mode: PopupMode,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(db: Database, user: User) -> Result<Self> {
        Self::with_today(db, user, query::today())
    }

    pub fn with_today(db: Database, user: User, today: NaiveDate) -> Result<Self> {
        let sort_key = config::default_sort(&db)?;
        let mut app = App {
            db,
            user,
            today,
            current_tab: TASKS_TAB,
            tasks: Vec::new(),
            visible: Vec::new(),
            configs: Vec::new(),
            stats: stats::compute_statistics(&[], today)?,
            query: Query::new().sort_by(sort_key),
            task_list_state: ListState::default(),
            config_list_state: ListState::default(),
            filter_list_state: ListState::default(),
            selected_day: today,
            should_quit: false,
            input_buffer: String::new(),
            config_value_buffer: String::new(),
            popup_mode: PopupMode::None,
            status_message: None,
        };
        app.refresh_data()?;
        Ok(app)
    }

    pub fn refresh_data(&mut self) -> Result<()> {
        self.tasks = self.db.list_tasks(self.user.id)?;
        self.configs = self.db.list_configs()?;
        self.stats = stats::compute_statistics(&self.tasks, self.today)?;
        clamp_selection(&mut self.config_list_state, self.configs.len());
        self.apply_query()
    }

    /// Re-runs the current query over the loaded tasks.
    pub fn apply_query(&mut self) -> Result<()> {
        self.visible = query::query_tasks(&self.tasks, &self.query, self.today)?;
        clamp_selection(&mut self.task_list_state, self.visible.len());
        log::debug!("{} of {} tasks visible", self.visible.len(), self.tasks.len());
        Ok(())
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.task_list_state.selected().and_then(|i| self.visible.get(i))
    }

    /// Tasks due on the day highlighted in the calendar, most important first.
    pub fn tasks_on_selected_day(&self) -> Result<Vec<Task>> {
        let query = Query::new()
            .quick(QuickFilter::DateEquals(self.selected_day))
            .sort_by(SortKey::Priority);
        Ok(query::query_tasks(&self.tasks, &query, self.today)?)
    }

    pub fn next_tab(&mut self) {
        self.current_tab = (self.current_tab + 1) % TAB_TITLES.len();
    }

    pub fn previous_tab(&mut self) {
        self.current_tab = if self.current_tab == 0 {
            TAB_TITLES.len() - 1
        } else {
            self.current_tab - 1
        };
    }

    pub fn next_item(&mut self) {
        match self.current_tab {
            TASKS_TAB => step_selection(&mut self.task_list_state, self.visible.len(), true),
            CONFIGS_TAB => step_selection(&mut self.config_list_state, self.configs.len(), true),
            _ => {}
        }
    }

    pub fn previous_item(&mut self) {
        match self.current_tab {
            TASKS_TAB => step_selection(&mut self.task_list_state, self.visible.len(), false),
            CONFIGS_TAB => step_selection(&mut self.config_list_state, self.configs.len(), false),
            _ => {}
        }
    }

    pub fn open_popup(&mut self, mode: PopupMode) {
        self.input_buffer.clear();
        match mode {
            PopupMode::Search => {
                self.input_buffer = self.query.search_text.clone().unwrap_or_default();
            }
            PopupMode::StructuredFilter => {
                let current = self
                    .query
                    .structured
                    .and_then(|filter| structured_options().iter().position(|option| *option == filter));
                self.filter_list_state.select(Some(current.unwrap_or(0)));
            }
            PopupMode::TaskPriority | PopupMode::TaskStatus | PopupMode::ConfirmDelete => {
                if self.selected_task().is_none() {
                    return;
                }
            }
            PopupMode::ConfigEdit => {
                let Some(config) = self.config_list_state.selected().and_then(|i| self.configs.get(i)) else {
                    return;
                };
                self.config_value_buffer = config.value.clone();
            }
            PopupMode::AddTask | PopupMode::None => {}
        }
        self.popup_mode = mode;
    }

    pub fn close_popup(&mut self) {
        self.popup_mode = PopupMode::None;
        self.input_buffer.clear();
        self.config_value_buffer.clear();
    }

    pub fn cycle_quick_filter(&mut self) -> Result<()> {
        self.query.quick = next_quick_filter(self.query.quick);
        self.apply_query()
    }

    pub fn cycle_sort(&mut self) -> Result<()> {
        self.query.sort_key = self.query.sort_key.next();
        self.apply_query()
    }

    fn update_selected(&mut self, update: TaskUpdate) -> Result<()> {
        let Some(id) = self.selected_task().map(|task| task.id) else {
            return Ok(());
        };
        let task = self.db.update_task(self.user.id, id, update)?;
        log::info!("updated task {}", task.id);
        self.status_message = Some(format!("Updated '{}' ({}, {})", task.title, task.status, task.priority));
        self.refresh_data()
    }

    pub fn complete_selected(&mut self) -> Result<()> {
        self.update_selected(TaskUpdate::status(Status::Completed))
    }

    pub fn delete_selected(&mut self) -> Result<()> {
        let Some(task) = self.selected_task().cloned() else {
            return Ok(());
        };
        self.db.delete_task(self.user.id, task.id)?;
        log::info!("deleted task {}", task.id);
        self.status_message = Some(format!("Deleted '{}'", task.title));
        self.refresh_data()
    }

    fn submit_new_task(&mut self) -> Result<()> {
        let title = self.input_buffer.trim().to_string();
        self.close_popup();
        if title.is_empty() {
            return Ok(());
        }
        let task = self.db.create_task(self.user.id, NewTask::titled(title))?;
        self.status_message = Some(format!("Created '{}' ({})", task.title, task.id));
        self.refresh_data()
    }

    fn submit_config_edit(&mut self) -> Result<()> {
        let Some(key) = self
            .config_list_state
            .selected()
            .and_then(|i| self.configs.get(i))
            .map(|config| config.key_name.clone())
        else {
            self.close_popup();
            return Ok(());
        };
        let value = self.config_value_buffer.trim().to_string();
        self.close_popup();
        if let Err(reason) = config::validate_value(&key, &value) {
            self.status_message = Some(format!("{key}: {reason}"));
            return Ok(());
        }
        self.db.set_config(&key, &value)?;
        if key == config::DEFAULT_SORT_KEY {
            self.query.sort_key = config::default_sort(&self.db)?;
        }
        self.status_message = Some(format!("{key} = {value}"));
        self.refresh_data()
    }

    /// Moves the calendar selection, by days or by whole months.
    pub fn move_selected_day(&mut self, days: i64) {
        let moved = if days >= 0 {
            self.selected_day.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.selected_day.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        if let Some(day) = moved {
            self.selected_day = day;
        }
    }

    pub fn shift_month(&mut self, forward: bool) {
        let moved = if forward {
            self.selected_day.checked_add_months(Months::new(1))
        } else {
            self.selected_day.checked_sub_months(Months::new(1))
        };
        if let Some(day) = moved {
            self.selected_day = day;
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<()> {
        if self.popup_mode != PopupMode::None {
            return self.handle_popup_key(code);
        }
        self.status_message = None;
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.next_tab(),
            KeyCode::BackTab => self.previous_tab(),
            KeyCode::Char('r') => self.refresh_data()?,
            _ => match self.current_tab {
                TASKS_TAB => self.handle_tasks_key(code)?,
                CALENDAR_TAB => self.handle_calendar_key(code),
                CONFIGS_TAB => self.handle_configs_key(code),
                _ => {}
            },
        }
        Ok(())
    }

    fn handle_tasks_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Down => self.next_item(),
            KeyCode::Up => self.previous_item(),
            KeyCode::Char('/') => self.open_popup(PopupMode::Search),
            KeyCode::Char('f') => self.cycle_quick_filter()?,
            KeyCode::Char('g') => self.open_popup(PopupMode::StructuredFilter),
            KeyCode::Char('o') => self.cycle_sort()?,
            KeyCode::Char('a') => self.open_popup(PopupMode::AddTask),
            KeyCode::Char('s') => self.open_popup(PopupMode::TaskStatus),
            KeyCode::Char('p') => self.open_popup(PopupMode::TaskPriority),
            KeyCode::Char('x') => self.complete_selected()?,
            KeyCode::Char('d') => self.open_popup(PopupMode::ConfirmDelete),
            _ => {}
        }
        Ok(())
    }

    fn handle_calendar_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Left => self.move_selected_day(-1),
            KeyCode::Right => self.move_selected_day(1),
            KeyCode::Up => self.move_selected_day(-7),
            KeyCode::Down => self.move_selected_day(7),
            KeyCode::Char('[') => self.shift_month(false),
            KeyCode::Char(']') => self.shift_month(true),
            KeyCode::Char('t') => self.selected_day = self.today,
            _ => {}
        }
    }

    fn handle_configs_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Down => self.next_item(),
            KeyCode::Up => self.previous_item(),
            KeyCode::Enter | KeyCode::Char('e') => self.open_popup(PopupMode::ConfigEdit),
            _ => {}
        }
    }

    fn handle_popup_key(&mut self, code: KeyCode) -> Result<()> {
        if code == KeyCode::Esc {
            self.close_popup();
            return Ok(());
        }
        match self.popup_mode {
            PopupMode::Search => match code {
                KeyCode::Enter => self.close_popup(),
                KeyCode::Backspace => {
                    self.input_buffer.pop();
                    self.apply_search()?;
                }
                KeyCode::Char(c) => {
                    self.input_buffer.push(c);
                    self.apply_search()?;
                }
                _ => {}
            },
            PopupMode::AddTask => match code {
                KeyCode::Enter => self.submit_new_task()?,
                KeyCode::Backspace => {
                    self.input_buffer.pop();
                }
                KeyCode::Char(c) => self.input_buffer.push(c),
                _ => {}
            },
            PopupMode::ConfigEdit => match code {
                KeyCode::Enter => self.submit_config_edit()?,
                KeyCode::Backspace => {
                    self.config_value_buffer.pop();
                }
                KeyCode::Char(c) => self.config_value_buffer.push(c),
                _ => {}
            },
            PopupMode::StructuredFilter => {
                let options = structured_options();
                match code {
                    KeyCode::Down => step_selection(&mut self.filter_list_state, options.len(), true),
                    KeyCode::Up => step_selection(&mut self.filter_list_state, options.len(), false),
                    KeyCode::Enter => {
                        self.query.structured = self
                            .filter_list_state
                            .selected()
                            .and_then(|i| options.get(i))
                            .copied();
                        self.close_popup();
                        self.apply_query()?;
                    }
                    KeyCode::Backspace => {
                        self.query.structured = None;
                        self.close_popup();
                        self.apply_query()?;
                    }
                    _ => {}
                }
            }
            PopupMode::TaskPriority => {
                let priority = match code {
                    KeyCode::Char('1') => Some(Priority::High),
                    KeyCode::Char('2') => Some(Priority::Medium),
                    KeyCode::Char('3') => Some(Priority::Low),
                    _ => None,
                };
                if let Some(priority) = priority {
                    self.close_popup();
                    self.update_selected(TaskUpdate {
                        priority: Some(priority),
                        ..Default::default()
                    })?;
                }
            }
            PopupMode::TaskStatus => {
                let status = match code {
                    KeyCode::Char('1') => Some(Status::ToDo),
                    KeyCode::Char('2') => Some(Status::InProgress),
                    KeyCode::Char('3') => Some(Status::Completed),
                    _ => None,
                };
                if let Some(status) = status {
                    self.close_popup();
                    self.update_selected(TaskUpdate::status(status))?;
                }
            }
            PopupMode::ConfirmDelete => match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.close_popup();
                    self.delete_selected()?;
                }
                KeyCode::Char('n') | KeyCode::Char('N') => self.close_popup(),
                _ => {}
            },
            PopupMode::None => {}
        }
        Ok(())
    }

    fn apply_search(&mut self) -> Result<()> {
        self.query.search_text = if self.input_buffer.trim().is_empty() {
            None
        } else {
            Some(self.input_buffer.clone())
        };
        self.apply_query()
    }
}

pub fn run_tui(db: Database, user: User) -> Result<()> {
    let mut app = App::new(db, user)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Runs one key action. Failures go to the footer, not stderr, since the
/// terminal is in the alternate screen.
fn dispatch_key(app: &mut App, code: KeyCode) {
    if let Err(err) = app.handle_key(code) {
        log::debug!("key {:?} failed: {err:#}", code);
        app.status_message = Some(format!("Error: {err}"));
    }
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                dispatch_key(app, key.code);
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());

    let titles: Vec<Line> = TAB_TITLES.iter().cloned().map(Line::from).collect();

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("DoDeck - {}", app.user.login_id)),
        )
        .select(app.current_tab)
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::Black),
        );

    f.render_widget(tabs, chunks[0]);

    match app.current_tab {
        TASKS_TAB => render_tasks(f, app, chunks[1]),
        ANALYTICS_TAB => render_analytics(f, app, chunks[1]),
        CALENDAR_TAB => render_calendar(f, app, chunks[1]),
        CONFIGS_TAB => render_configs(f, app, chunks[1]),
        _ => {}
    }

    let footer = match &app.status_message {
        Some(message) => Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
        None => Span::styled(
            "Tab: switch view | r: refresh | q: quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    f.render_widget(Paragraph::new(Line::from(footer)), chunks[2]);

    render_popup(f, app);
}

fn render_popup(f: &mut Frame, app: &mut App) {
    let (title, text) = match app.popup_mode {
        PopupMode::None => return,
        PopupMode::StructuredFilter => {
            render_filter_popup(f, app);
            return;
        }
        PopupMode::Search => (
            "Search Tasks",
            format!("Title or description contains:\n\n{}_\n\nENTER: keep | ESC: close", app.input_buffer),
        ),
        PopupMode::AddTask => (
            "Add Task",
            format!("Title:\n\n{}_\n\nPress ENTER to save\nPress ESC to cancel", app.input_buffer),
        ),
        PopupMode::TaskPriority => (
            "Change Task Priority",
            "Select new priority:\n\n1. High\n2. Medium\n3. Low\n\nPress ESC to cancel".to_string(),
        ),
        PopupMode::TaskStatus => (
            "Change Task Status",
            "Select new status:\n\n1. To Do\n2. In Progress\n3. Completed\n\nPress ESC to cancel".to_string(),
        ),
        PopupMode::ConfirmDelete => {
            let title = app.selected_task().map(|task| task.title.as_str()).unwrap_or("");
            (
                "Delete Task",
                format!("Delete '{title}'?\nThis cannot be undone.\n\ny: delete | n: keep"),
            )
        }
        PopupMode::ConfigEdit => (
            "Edit Config Value",
            format!(
                "Enter new value for config:\n\n{}_\n\nPress ENTER to save\nPress ESC to cancel",
                app.config_value_buffer
            ),
        ),
    };

    let popup_area = centered_rect(50, 30, f.area());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::DarkGray));
    let content = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));

    f.render_widget(Clear, popup_area);
    f.render_widget(content, popup_area);
}

fn render_filter_popup(f: &mut Frame, app: &mut App) {
    let popup_area = centered_rect(40, 60, f.area());
    let items: Vec<ListItem> = structured_options()
        .iter()
        .map(|option| ListItem::new(option.to_string()))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title("Filter (ENTER: apply | BACKSPACE: clear | ESC: cancel)")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::DarkGray)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_widget(Clear, popup_area);
    f.render_stateful_widget(list, popup_area, &mut app.filter_list_state);
}

// Helper function to create centered rectangles for popups
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Completed => Color::Green,
        Status::InProgress => Color::Yellow,
        Status::ToDo => Color::Blue,
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Cyan,
        Priority::Low => Color::Gray,
    }
}

fn task_line(task: &Task) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("{} ", task.title), Style::default().fg(Color::White)),
        Span::styled(
            format!("[{}] ", task.priority),
            Style::default().fg(priority_color(task.priority)),
        ),
        Span::styled(
            format!("[{}]", task.status),
            Style::default().fg(status_color(task.status)),
        ),
    ];
    if let Some(due) = task.due_date {
        spans.push(Span::styled(
            format!(" due {}", due.format("%m-%d")),
            Style::default().fg(Color::Magenta),
        ));
    }
    Line::from(spans)
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let mut criteria = vec![format!("sort: {}", app.query.sort_key)];
    if let Some(quick) = app.query.quick {
        criteria.push(quick.to_string());
    }
    if let Some(structured) = app.query.structured {
        criteria.push(structured.to_string());
    }
    if let Some(text) = &app.query.search_text {
        criteria.push(format!("\"{text}\""));
    }

    let tasks: Vec<ListItem> = app.visible.iter().map(|task| ListItem::new(task_line(task))).collect();

    let tasks_list = List::new(tasks)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Tasks {}/{} ({})", app.visible.len(), app.tasks.len(), criteria.join(", "))),
        )
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(tasks_list, chunks[0], &mut app.task_list_state);

    let controls = "Controls:\n• ↑/↓: Navigate\n• /: Search\n• f: Quick filter\n• g: Filter by field\n• o: Sort order\n• a: Add task\n• s: Change status\n• p: Change priority\n• x: Complete\n• d: Delete";
    let info_text = if let Some(task) = app.selected_task() {
        let due = task
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "Task: {} {}\nDescription: {}\nPriority: {}\nCategory: {}\nStatus: {}\nDue: {}\nArchived: {}\nCreated: {}\nUpdated: {}\n\n{}",
            task.id,
            task.title,
            task.description,
            task.priority,
            task.category,
            task.status,
            due,
            if task.archived { "yes" } else { "no" },
            task.created_at.format("%Y-%m-%d %H:%M"),
            task.updated_at.format("%Y-%m-%d %H:%M"),
            controls
        )
    } else {
        format!("No task selected\n\n{controls}")
    };

    let info_paragraph = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Task Info"))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));

    f.render_widget(info_paragraph, chunks[1]);
}

fn render_analytics(f: &mut Frame, app: &mut App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(8)].as_ref())
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(rows[0]);

    let stats = &app.stats;
    let summary = vec![
        Line::from(format!("Total Tasks:     {}", stats.total)),
        Line::from(format!("Completed:       {}", stats.completed)),
        Line::from(format!("Pending:         {}", stats.pending)),
        Line::from(Span::styled(
            format!("Overdue:         {}", stats.overdue),
            Style::default().fg(if stats.overdue > 0 { Color::Red } else { Color::White }),
        )),
        Line::from(format!("Completion Rate: {:.1}%", stats.completion_rate)),
        Line::from(format!("Points:          {}", stats.points)),
        Line::from(format!(
            "Top:             {} / {}",
            stats.top_category.map(|c| c.label()).unwrap_or("-"),
            stats.top_priority.map(|p| p.label()).unwrap_or("-")
        )),
    ];
    f.render_widget(
        Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("Summary")),
        top[0],
    );

    let mut breakdown: Vec<String> = Vec::new();
    breakdown.push(
        stats
            .by_status
            .iter()
            .map(|(status, count)| format!("{status}: {count}"))
            .collect::<Vec<_>>()
            .join("  "),
    );
    breakdown.push(
        stats
            .by_priority
            .iter()
            .map(|(priority, count)| format!("{priority}: {count}"))
            .collect::<Vec<_>>()
            .join("  "),
    );
    breakdown.push(String::new());
    breakdown.extend(
        stats
            .by_category
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(category, count)| format!("{category}: {count}")),
    );
    f.render_widget(
        Paragraph::new(breakdown.join("\n"))
            .block(Block::default().borders(Borders::ALL).title("Breakdown"))
            .wrap(Wrap { trim: false }),
        top[1],
    );

    let data: Vec<(&str, u64)> = stats
        .weekly_trend
        .iter()
        .map(|point| (point.label.as_str(), point.completed as u64))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Completed This Week"))
        .data(data.as_slice())
        .bar_width(5)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Green))
        .value_style(Style::default().fg(Color::Black).bg(Color::Green));
    f.render_widget(chart, rows[1]);
}

fn render_calendar(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let (year, month) = (app.selected_day.year(), app.selected_day.month());
    let grid = match (
        stats::calendar_weeks(year, month),
        stats::due_counts_for_month(&app.tasks, year, month),
    ) {
        (Ok(weeks), Ok(counts)) => {
            let mut lines = vec![Line::from(Span::styled(
                " Su   Mo   Tu   We   Th   Fr   Sa",
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            for week in weeks {
                let spans: Vec<Span> = week
                    .iter()
                    .map(|cell| {
                        let Some(day) = cell else {
                            return Span::raw("     ");
                        };
                        let count = counts.get(day).copied().unwrap_or(0);
                        let mut style = if count > 0 {
                            Style::default().fg(Color::Yellow)
                        } else {
                            Style::default().fg(Color::White)
                        };
                        if *day == app.today {
                            style = style.add_modifier(Modifier::UNDERLINED);
                        }
                        if *day == app.selected_day {
                            style = style.bg(Color::LightGreen).fg(Color::Black);
                        }
                        let marker = if count > 0 { format!("{count:<2}") } else { "  ".to_string() };
                        Span::styled(format!("{:>3}{}", day.day(), marker), style)
                    })
                    .collect();
                lines.push(Line::from(spans));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("←/→/↑/↓: Move day | [/]: Month | t: Today"));
            lines
        }
        (Err(err), _) | (_, Err(err)) => vec![Line::from(err.to_string())],
    };

    f.render_widget(
        Paragraph::new(grid).block(
            Block::default()
                .borders(Borders::ALL)
                .title(app.selected_day.format("%B %Y").to_string()),
        ),
        chunks[0],
    );

    let due_items: Vec<ListItem> = match app.tasks_on_selected_day() {
        Ok(tasks) if tasks.is_empty() => vec![ListItem::new("Nothing due")],
        Ok(tasks) => tasks.iter().map(|task| ListItem::new(task_line(task))).collect(),
        Err(err) => vec![ListItem::new(err.to_string())],
    };
    f.render_widget(
        List::new(due_items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Due {}", app.selected_day.format("%Y-%m-%d"))),
        ),
        chunks[1],
    );
}

fn render_configs(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let configs: Vec<ListItem> = app
        .configs
        .iter()
        .map(|config| {
            ListItem::new(vec![Line::from(vec![
                Span::styled(
                    format!("{} ", config.key_name),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("={}", config.value),
                    Style::default().fg(Color::Cyan),
                ),
            ])])
        })
        .collect();

    let configs_list = List::new(configs)
        .block(Block::default().borders(Borders::ALL).title("Configs"))
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(configs_list, chunks[0], &mut app.config_list_state);

    let selected_config = app.config_list_state.selected().and_then(|i| app.configs.get(i));
    let info_text = if let Some(config) = selected_config {
        format!(
            "Config: {}\nValue: {}\nDescription: {}\nCreated: {}\nUpdated: {}\n\nControls:\n• Enter: Edit config value\n• r: Refresh\n• q: Quit",
            config.key_name,
            config.value,
            config.description.as_deref().unwrap_or("-"),
            config.created_at,
            config.updated_at
        )
    } else {
        "No config selected\n\nSet one with `dodeck set <KEY> <VALUE>`\n\nControls:\n• ↑/↓: Navigate\n• Enter: Edit config value\n• r: Refresh\n• q: Quit".to_string()
    };

    let info_paragraph = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Config Info"))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));

    f.render_widget(info_paragraph, chunks[1]);
}
