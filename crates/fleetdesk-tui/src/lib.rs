// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use fleetdesk_app::{
    AppCommand, AppEvent, AppMode, AppState, ColumnSpec, DashboardCounts, Device, DeviceForm,
    DeviceId, DeviceKind, DeviceUpdate, EndRelationForm, FormKind, INSTALL_STATUS_OPTIONS,
    LinkKind, ListCache, ListKind, ListParams, NewDevice, NewWorknote, PageItem, QueryKey,
    RelationId, RelationView, TICKET_STATUS_OPTIONS, TabKind, Ticket, TicketForm, TicketId,
    TicketPayload, TicketView, User, UserForm, UserId, UserPayload, UserRef, WorknoteForm,
    WorknoteView, columns_for, page_items, total_pages,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::Date;

const LINK_ARROW: &str = "→";
const NULL_PLACEHOLDER: &str = "None";
const SKELETON_CELL: &str = "▒▒▒▒";
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// One fetched list page, as the runtime hands it to the view layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    pub rows: ListRows,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListRows {
    Computers(Vec<Device>),
    Monitors(Vec<Device>),
    Users(Vec<User>),
    Tickets(Vec<TicketView>),
    Relations(Vec<RelationView>),
}

impl ListRows {
    pub const fn kind(&self) -> ListKind {
        match self {
            Self::Computers(_) => ListKind::Computers,
            Self::Monitors(_) => ListKind::Monitors,
            Self::Users(_) => ListKind::Users,
            Self::Tickets(_) => ListKind::Tickets,
            Self::Relations(_) => ListKind::Relations,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Computers(rows) | Self::Monitors(rows) => rows.len(),
            Self::Users(rows) => rows.len(),
            Self::Tickets(rows) => rows.len(),
            Self::Relations(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDetail {
    pub device: Device,
    /// Assignment history, newest first.
    pub history: Vec<RelationView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub caller: Option<UserRef>,
    pub assigned_to: Option<UserRef>,
    /// Worknotes, newest first.
    pub worknotes: Vec<WorknoteView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserDetail {
    pub user: User,
    pub devices: Vec<Device>,
    pub tickets: Vec<Ticket>,
}

/// A validated mutation on its way to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum FormSubmission {
    CreateDevice(NewDevice),
    UpdateDevice(DeviceId, DeviceUpdate),
    DeleteDevice(DeviceId),
    CreateUser(UserPayload),
    UpdateUser(UserId, UserPayload),
    DeleteUser(UserId),
    CreateTicket(TicketPayload),
    UpdateTicket(TicketId, TicketPayload),
    DeleteTicket(TicketId),
    AddWorknote(NewWorknote),
    EndRelation(RelationId, Date),
}

impl FormSubmission {
    /// Entities whose cached list pages this mutation invalidates. Device
    /// writes touch relations too since assignment opens and closes them.
    pub fn touched_kinds(&self) -> &'static [ListKind] {
        match self {
            Self::CreateDevice(_) | Self::UpdateDevice(..) | Self::DeleteDevice(_) => &[
                ListKind::Computers,
                ListKind::Monitors,
                ListKind::Relations,
            ],
            Self::CreateUser(_) | Self::UpdateUser(..) | Self::DeleteUser(_) => {
                &[ListKind::Users, ListKind::Tickets, ListKind::Relations]
            }
            Self::CreateTicket(_)
            | Self::UpdateTicket(..)
            | Self::DeleteTicket(_)
            | Self::AddWorknote(_) => &[ListKind::Tickets],
            Self::EndRelation(..) => &[
                ListKind::Relations,
                ListKind::Computers,
                ListKind::Monitors,
            ],
        }
    }
}

pub trait AppRuntime {
    fn page_size(&self) -> u64 {
        20
    }
    fn load_dashboard_counts(&mut self) -> Result<DashboardCounts>;
    fn load_list(&mut self, kind: ListKind, params: &ListParams) -> Result<ListSnapshot>;
    fn load_device_detail(&mut self, id: DeviceId) -> Result<Option<DeviceDetail>>;
    fn load_ticket_detail(&mut self, id: TicketId) -> Result<Option<TicketDetail>>;
    fn load_user_detail(&mut self, id: UserId) -> Result<Option<UserDetail>>;
    /// `(id, email)` pairs for the user pickers, ordered by email.
    fn list_user_options(&mut self) -> Result<Vec<(UserId, String)>>;
    fn submit(&mut self, submission: &FormSubmission) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
enum TableCell {
    Text(String),
    Number(i64),
    Day(Date),
    Missing,
}

impl TableCell {
    fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Number(value) => value.to_string(),
            Self::Day(value) => value.to_string(),
            Self::Missing => NULL_PLACEHOLDER.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TableProjection {
    columns: Vec<&'static str>,
    rows: Vec<Vec<TableCell>>,
}

/// Exactly one of the four list-view states.
#[derive(Debug, Clone, PartialEq)]
enum TableContent {
    Loading {
        columns: Vec<&'static str>,
        slots: usize,
    },
    Error {
        message: String,
    },
    Empty {
        text: String,
    },
    Rows {
        projection: TableProjection,
        stale: bool,
    },
}

/// View state of one entity list. `snapshot` holds the last good page so it
/// can stay visible while a new key revalidates.
#[derive(Debug, Clone, PartialEq, Default)]
struct ListView {
    snapshot: Option<ListSnapshot>,
    loading: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum DetailSnapshot {
    Device(DeviceDetail),
    Ticket(TicketDetail),
    User(UserDetail),
    NotFound { noun: &'static str, id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
struct DetailEntry {
    title: String,
    snapshot: DetailSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkTarget {
    Device(DeviceKind, DeviceId),
    User(UserId),
    Ticket(TicketId),
}

#[derive(Debug, Clone, PartialEq)]
enum FormUi {
    Device(DeviceForm),
    User(UserForm),
    Ticket(TicketForm),
    Worknote(WorknoteForm),
    EndRelation(EndRelationForm),
}

impl FormUi {
    const fn kind(&self) -> FormKind {
        match self {
            Self::Device(_) => FormKind::Device,
            Self::User(_) => FormKind::User,
            Self::Ticket(_) => FormKind::Ticket,
            Self::Worknote(_) => FormKind::Worknote,
            Self::EndRelation(_) => FormKind::EndRelation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FilterEditor {
    kind: ListKind,
    column: usize,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

struct ViewData {
    per_page: u64,
    dashboard_counts: DashboardCounts,
    cache: ListCache<ListSnapshot>,
    views: HashMap<ListKind, ListView>,
    selected_row: usize,
    selected_col: usize,
    detail_stack: Vec<DetailEntry>,
    filter_editor: Option<FilterEditor>,
    form: Option<FormUi>,
    form_cursor: usize,
    user_options: Vec<(UserId, String)>,
    status_token: u64,
}

impl ViewData {
    fn new(per_page: u64) -> Self {
        Self {
            per_page,
            dashboard_counts: DashboardCounts::default(),
            cache: ListCache::new(),
            views: HashMap::new(),
            selected_row: 0,
            selected_col: 0,
            detail_stack: Vec::new(),
            filter_editor: None,
            form: None,
            form_cursor: 0,
            user_options: Vec::new(),
            status_token: 0,
        }
    }

    fn active_view(&self, state: &AppState) -> Option<&ListView> {
        let kind = state.active_tab.list_kind()?;
        self.views.get(&kind)
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(runtime.page_size());
    let (internal_tx, internal_rx) = mpsc::channel();

    refresh_dashboard(state, runtime, &mut view_data);
    refresh_active_list(state, runtime, &mut view_data, false);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(state: &mut AppState, view_data: &ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let tx = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = tx.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token += 1;
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    match state.mode {
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
        AppMode::Filter => {
            handle_filter_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Form(_) => {
            handle_form_key(state, runtime, view_data, internal_tx, key);
            false
        }
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => {
            if view_data.detail_stack.pop().is_none() {
                dispatch_and_refresh(state, runtime, view_data, AppCommand::ClearStatus);
            }
        }
        KeyCode::Tab | KeyCode::Char('l') if view_data.detail_stack.is_empty() => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::NextTab);
        }
        KeyCode::BackTab | KeyCode::Char('h') if view_data.detail_stack.is_empty() => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::PrevTab);
        }
        KeyCode::Char('j') | KeyCode::Down => move_row(state, view_data, 1),
        KeyCode::Char('k') | KeyCode::Up => move_row(state, view_data, -1),
        KeyCode::Right => move_col(state, view_data, 1),
        KeyCode::Left => move_col(state, view_data, -1),
        KeyCode::Char('n') => step_page(state, runtime, view_data, 1),
        KeyCode::Char('p') => step_page(state, runtime, view_data, -1),
        KeyCode::Char('/') => open_filter_editor(state, view_data),
        KeyCode::Char('x') => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::ClearFilters);
            emit_status(state, view_data, internal_tx, "filters cleared");
        }
        KeyCode::Char('r') => {
            refresh_dashboard(state, runtime, view_data);
            refresh_active_list(state, runtime, view_data, true);
        }
        KeyCode::Char('a') => {
            if let Err(error) = open_add_form(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
        }
        KeyCode::Char('e') => {
            if let Err(error) = open_edit_form(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
        }
        KeyCode::Char('d') => {
            if let Err(error) = delete_selected(state, runtime, view_data, internal_tx) {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
        }
        KeyCode::Char('E') => {
            if let Err(error) = open_end_relation_form(state, view_data) {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
        }
        KeyCode::Char('w') => {
            if let Err(error) = open_worknote_form(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
        }
        KeyCode::Enter => {
            if let Err(error) = follow_selected_link(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
        }
        _ => {}
    }
    false
}

fn handle_filter_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(editor) = view_data.filter_editor.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    let columns = columns_for(editor.kind);
    match key.code {
        KeyCode::Esc => {
            view_data.filter_editor = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Left if editor.column > 0 => {
            editor.column -= 1;
            editor.value = current_filter_value(state, editor);
        }
        KeyCode::Right if editor.column + 1 < columns.len() => {
            editor.column += 1;
            editor.value = current_filter_value(state, editor);
        }
        KeyCode::Backspace => {
            editor.value.pop();
        }
        KeyCode::Char(c) => editor.value.push(c),
        KeyCode::Enter => {
            let field = columns[editor.column].field.to_owned();
            let value = editor.value.clone();
            view_data.filter_editor = None;
            state.dispatch(AppCommand::ExitToNav);
            dispatch_and_refresh(state, runtime, view_data, AppCommand::SetFilter {
                field,
                value,
            });
            emit_status(state, view_data, internal_tx, "filter applied");
        }
        _ => {}
    }
}

fn current_filter_value(state: &AppState, editor: &FilterEditor) -> String {
    let field = columns_for(editor.kind)[editor.column].field;
    state
        .params(editor.kind)
        .filters
        .get(field)
        .unwrap_or_default()
        .to_owned()
}

fn open_filter_editor(state: &mut AppState, view_data: &mut ViewData) {
    let Some(kind) = state.active_tab.list_kind() else {
        return;
    };
    if !view_data.detail_stack.is_empty() {
        return;
    }
    let column = view_data.selected_col.min(columns_for(kind).len() - 1);
    let mut editor = FilterEditor {
        kind,
        column,
        value: String::new(),
    };
    editor.value = current_filter_value(state, &editor);
    view_data.filter_editor = Some(editor);
    state.dispatch(AppCommand::EnterFilterMode);
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    let field_count = form_field_count(form);
    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Down | KeyCode::Tab => {
            view_data.form_cursor = (view_data.form_cursor + 1) % field_count;
        }
        KeyCode::Up | KeyCode::BackTab => {
            view_data.form_cursor = (view_data.form_cursor + field_count - 1) % field_count;
        }
        KeyCode::Left => cycle_form_field(form, view_data.form_cursor, -1, &view_data.user_options),
        KeyCode::Right => cycle_form_field(form, view_data.form_cursor, 1, &view_data.user_options),
        KeyCode::Backspace => form_backspace(form, view_data.form_cursor),
        KeyCode::Char(c) => form_input_char(form, view_data.form_cursor, c),
        KeyCode::Enter => {
            let outcome = submission_for(form).and_then(|submission| {
                runtime.submit(&submission)?;
                Ok(submission)
            });
            match outcome {
                Ok(submission) => {
                    view_data.form = None;
                    state.dispatch(AppCommand::ExitToNav);
                    apply_submission_effects(state, runtime, view_data, &submission);
                    emit_status(state, view_data, internal_tx, "saved");
                }
                Err(error) => {
                    emit_status(state, view_data, internal_tx, format!("{error:#}"));
                }
            }
        }
        _ => {}
    }
}

/// Post-mutation bookkeeping: drop the touched entities' cached pages,
/// refetch the visible list, and reload an open detail view.
fn apply_submission_effects<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    submission: &FormSubmission,
) {
    for kind in submission.touched_kinds() {
        view_data.cache.invalidate(*kind);
    }
    refresh_dashboard(state, runtime, view_data);
    refresh_active_list(state, runtime, view_data, false);
    reload_top_detail(runtime, view_data);
}

fn reload_top_detail<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) {
    let Some(entry) = view_data.detail_stack.last() else {
        return;
    };
    let reloaded = match &entry.snapshot {
        DetailSnapshot::Device(detail) => runtime
            .load_device_detail(detail.device.id)
            .ok()
            .flatten()
            .map(DetailSnapshot::Device),
        DetailSnapshot::Ticket(detail) => runtime
            .load_ticket_detail(detail.ticket.id)
            .ok()
            .flatten()
            .map(DetailSnapshot::Ticket),
        DetailSnapshot::User(detail) => runtime
            .load_user_detail(detail.user.id)
            .ok()
            .flatten()
            .map(DetailSnapshot::User),
        DetailSnapshot::NotFound { .. } => None,
    };
    if let (Some(snapshot), Some(entry)) = (reloaded, view_data.detail_stack.last_mut()) {
        entry.snapshot = snapshot;
    }
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    let mut needs_refresh = false;
    for event in &events {
        match event {
            AppEvent::TabChanged(_) => {
                view_data.selected_row = 0;
                view_data.selected_col = 0;
                needs_refresh = true;
            }
            AppEvent::ParamsChanged(_) => needs_refresh = true,
            _ => {}
        }
    }
    if needs_refresh {
        if state.active_tab == TabKind::Dashboard {
            refresh_dashboard(state, runtime, view_data);
        } else {
            refresh_active_list(state, runtime, view_data, false);
        }
    }
}

fn refresh_dashboard<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) {
    match runtime.load_dashboard_counts() {
        Ok(counts) => view_data.dashboard_counts = counts,
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(format!("{error:#}")));
        }
    }
}

/// Serve the active list from cache when the key is known; otherwise fetch,
/// keeping the previous rows on screen flagged as loading. `force` bypasses
/// the cache (manual retry).
fn refresh_active_list<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    force: bool,
) {
    let Some(kind) = state.active_tab.list_kind() else {
        return;
    };
    let params = state.params(kind).clone();
    let key = QueryKey::new(kind, &params);

    if !force {
        if let Some(snapshot) = view_data.cache.get(&key) {
            let snapshot = snapshot.clone();
            let view = view_data.views.entry(kind).or_default();
            view.snapshot = Some(snapshot);
            view.loading = false;
            view.error = None;
            clamp_selection(state, view_data);
            return;
        }
    }

    {
        let view = view_data.views.entry(kind).or_default();
        view.loading = true;
        view.error = None;
    }
    match runtime.load_list(kind, &params) {
        Ok(snapshot) => {
            view_data.cache.insert(key, snapshot.clone());
            let view = view_data.views.entry(kind).or_default();
            view.snapshot = Some(snapshot);
            view.loading = false;
            clamp_selection(state, view_data);
        }
        Err(error) => {
            let view = view_data.views.entry(kind).or_default();
            view.loading = false;
            view.error = Some(format!("{error:#}"));
        }
    }
}

fn clamp_selection(state: &AppState, view_data: &mut ViewData) {
    let rows = view_data
        .active_view(state)
        .and_then(|view| view.snapshot.as_ref())
        .map_or(0, |snapshot| snapshot.rows.len());
    if rows == 0 {
        view_data.selected_row = 0;
    } else if view_data.selected_row >= rows {
        view_data.selected_row = rows - 1;
    }
    if let Some(kind) = state.active_tab.list_kind() {
        let columns = columns_for(kind).len();
        if view_data.selected_col >= columns {
            view_data.selected_col = columns.saturating_sub(1);
        }
    }
}

fn move_row(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let rows = view_data
        .active_view(state)
        .and_then(|view| view.snapshot.as_ref())
        .map_or(0, |snapshot| snapshot.rows.len());
    if rows == 0 {
        return;
    }
    let current = view_data.selected_row as isize;
    view_data.selected_row = (current + delta).clamp(0, rows as isize - 1) as usize;
}

fn move_col(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let Some(kind) = state.active_tab.list_kind() else {
        return;
    };
    let columns = columns_for(kind).len() as isize;
    let current = view_data.selected_col as isize;
    view_data.selected_col = (current + delta).clamp(0, columns - 1) as usize;
}

/// Previous/next page; inert at the edges.
fn step_page<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    delta: i64,
) {
    let Some(kind) = state.active_tab.list_kind() else {
        return;
    };
    let total = view_data
        .views
        .get(&kind)
        .and_then(|view| view.snapshot.as_ref())
        .map_or(0, |snapshot| snapshot.total);
    let pages = total_pages(total, view_data.per_page);
    let current = state.params(kind).page;
    let Some(target) = clamp_page_step(current, pages, delta) else {
        return;
    };
    dispatch_and_refresh(state, runtime, view_data, AppCommand::GoToPage(target));
}

fn clamp_page_step(current: u64, total_pages: u64, delta: i64) -> Option<u64> {
    let target = current.checked_add_signed(delta)?;
    if target < 1 || target > total_pages || target == current {
        return None;
    }
    Some(target)
}

fn follow_selected_link<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    if !view_data.detail_stack.is_empty() {
        return Ok(());
    }
    let Some(kind) = state.active_tab.list_kind() else {
        return Ok(());
    };
    let columns = columns_for(kind);
    let Some(column) = columns.get(view_data.selected_col) else {
        return Ok(());
    };
    let target = view_data
        .views
        .get(&kind)
        .and_then(|view| view.snapshot.as_ref())
        .and_then(|snapshot| link_target(&snapshot.rows, view_data.selected_row, column));
    let Some(target) = target else {
        bail!("no link on this column");
    };
    open_link_target(runtime, view_data, target)
}

fn open_link_target<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    target: LinkTarget,
) -> Result<()> {
    let entry = match target {
        LinkTarget::Device(kind, id) => match runtime.load_device_detail(id)? {
            Some(detail) => DetailEntry {
                title: detail.device.serial_number.clone(),
                snapshot: DetailSnapshot::Device(detail),
            },
            None => DetailEntry {
                title: format!("{} {}", kind.noun(), id.get()),
                snapshot: DetailSnapshot::NotFound {
                    noun: kind.noun(),
                    id: id.get(),
                },
            },
        },
        LinkTarget::User(id) => match runtime.load_user_detail(id)? {
            Some(detail) => DetailEntry {
                title: detail.user.email.clone(),
                snapshot: DetailSnapshot::User(detail),
            },
            None => DetailEntry {
                title: format!("user {}", id.get()),
                snapshot: DetailSnapshot::NotFound {
                    noun: "user",
                    id: id.get(),
                },
            },
        },
        LinkTarget::Ticket(id) => match runtime.load_ticket_detail(id)? {
            Some(detail) => DetailEntry {
                title: format!("#{}", detail.ticket.number),
                snapshot: DetailSnapshot::Ticket(detail),
            },
            None => DetailEntry {
                title: format!("ticket {}", id.get()),
                snapshot: DetailSnapshot::NotFound {
                    noun: "ticket",
                    id: id.get(),
                },
            },
        },
    };
    view_data.detail_stack.push(entry);
    Ok(())
}

// ---------------------------------------------------------------------------
// Projection: column specs resolved against rows.

fn projection_for(snapshot: &ListSnapshot) -> TableProjection {
    let columns = columns_for(snapshot.rows.kind());
    let rows = (0..snapshot.rows.len())
        .map(|index| {
            columns
                .iter()
                .map(|column| cell_for(&snapshot.rows, index, column.field))
                .collect()
        })
        .collect();
    TableProjection {
        columns: columns.iter().map(|column| column.label).collect(),
        rows,
    }
}

fn cell_for(rows: &ListRows, index: usize, field: &str) -> TableCell {
    match rows {
        ListRows::Computers(devices) | ListRows::Monitors(devices) => devices
            .get(index)
            .map_or(TableCell::Missing, |device| device_cell(device, field)),
        ListRows::Users(users) => users
            .get(index)
            .map_or(TableCell::Missing, |user| user_cell(user, field)),
        ListRows::Tickets(tickets) => tickets
            .get(index)
            .map_or(TableCell::Missing, |ticket| ticket_cell(ticket, field)),
        ListRows::Relations(relations) => relations
            .get(index)
            .map_or(TableCell::Missing, |relation| relation_cell(relation, field)),
    }
}

fn device_cell(device: &Device, field: &str) -> TableCell {
    match field {
        "id" => TableCell::Number(device.id.get()),
        "serial_number" => TableCell::Text(device.serial_number.clone()),
        "model" => TableCell::Text(device.model.clone()),
        "order_id" => TableCell::Text(device.order_id.clone()),
        "install_status" => TableCell::Text(device.install_status.as_str().to_owned()),
        _ => TableCell::Missing,
    }
}

fn user_cell(user: &User, field: &str) -> TableCell {
    match field {
        "id" => TableCell::Number(user.id.get()),
        "name" => TableCell::Text(user.name.clone()),
        "email" => TableCell::Text(user.email.clone()),
        _ => TableCell::Missing,
    }
}

fn ticket_cell(ticket: &TicketView, field: &str) -> TableCell {
    match field {
        "id" => TableCell::Number(ticket.id.get()),
        "number" => TableCell::Number(ticket.number),
        "title" => TableCell::Text(ticket.title.clone()),
        "status" => TableCell::Text(ticket.status.as_str().to_owned()),
        "caller.email" => ticket
            .caller
            .as_ref()
            .map_or(TableCell::Missing, |caller| {
                TableCell::Text(caller.email.clone())
            }),
        "caller.id" => ticket
            .caller
            .as_ref()
            .map_or(TableCell::Missing, |caller| {
                TableCell::Number(caller.id.get())
            }),
        "assigned_to.email" => ticket
            .assigned_to
            .as_ref()
            .map_or(TableCell::Missing, |assignee| {
                TableCell::Text(assignee.email.clone())
            }),
        "assigned_to.id" => ticket
            .assigned_to
            .as_ref()
            .map_or(TableCell::Missing, |assignee| {
                TableCell::Number(assignee.id.get())
            }),
        "created_at" => TableCell::Day(ticket.created_at.date()),
        "estimated_resolution_date" => ticket
            .estimated_resolution_date
            .map_or(TableCell::Missing, |at| TableCell::Day(at.date())),
        "resolution_date" => ticket
            .resolution_date
            .map_or(TableCell::Missing, |at| TableCell::Day(at.date())),
        _ => TableCell::Missing,
    }
}

fn relation_cell(relation: &RelationView, field: &str) -> TableCell {
    match field {
        "id" => TableCell::Number(relation.id.get()),
        "device.id" => TableCell::Number(relation.device.id.get()),
        "device.serial_number" => TableCell::Text(relation.device.serial_number.clone()),
        "device.model" => TableCell::Text(relation.device.model.clone()),
        "user.id" => TableCell::Number(relation.user.id.get()),
        "user.email" => TableCell::Text(relation.user.email.clone()),
        "start_date" => TableCell::Day(relation.start_date),
        "end_date" => relation.end_date.map_or(TableCell::Missing, TableCell::Day),
        _ => TableCell::Missing,
    }
}

fn link_target(rows: &ListRows, index: usize, column: &ColumnSpec) -> Option<LinkTarget> {
    let link = column.link?;
    let TableCell::Number(id) = cell_for(rows, index, link.id_field) else {
        return None;
    };
    match link.kind {
        LinkKind::Computer => Some(LinkTarget::Device(DeviceKind::Computer, DeviceId::new(id))),
        LinkKind::Monitor => Some(LinkTarget::Device(DeviceKind::Monitor, DeviceId::new(id))),
        LinkKind::User => Some(LinkTarget::User(UserId::new(id))),
        LinkKind::Ticket => Some(LinkTarget::Ticket(TicketId::new(id))),
        LinkKind::DeviceByKind => {
            let ListRows::Relations(relations) = rows else {
                return None;
            };
            let kind = relations.get(index)?.device.kind;
            Some(LinkTarget::Device(kind, DeviceId::new(id)))
        }
    }
}

fn selected_row_id(rows: &ListRows, index: usize) -> Option<i64> {
    match cell_for(rows, index, "id") {
        TableCell::Number(id) => Some(id),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Four-state table content.

fn table_content(view: &ListView, kind: ListKind, slots: usize) -> TableContent {
    if let Some(raw) = &view.error {
        return TableContent::Error {
            message: error_display_message(raw),
        };
    }
    match &view.snapshot {
        Some(snapshot) if snapshot.rows.is_empty() => TableContent::Empty {
            text: format!("No {}s found", kind.noun()),
        },
        Some(snapshot) => TableContent::Rows {
            projection: projection_for(snapshot),
            stale: view.loading,
        },
        None => TableContent::Loading {
            columns: columns_for(kind)
                .iter()
                .map(|column| column.label)
                .collect(),
            slots,
        },
    }
}

fn error_display_message(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "Something went wrong".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn pagination_line(current: u64, total: u64) -> String {
    let items = page_items(current, total);
    if items.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = items
        .iter()
        .map(|item| match item {
            PageItem::Page(page) if *page == current => format!("[{page}]"),
            PageItem::Page(page) => page.to_string(),
            PageItem::Ellipsis => "…".to_owned(),
        })
        .collect();
    format!("‹ {} ›", rendered.join(" "))
}

// ---------------------------------------------------------------------------
// Forms.

fn open_add_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    if !view_data.detail_stack.is_empty() {
        return Ok(());
    }
    let form = match state.active_tab {
        TabKind::Computers => FormUi::Device(DeviceForm::add(DeviceKind::Computer)),
        TabKind::Monitors => FormUi::Device(DeviceForm::add(DeviceKind::Monitor)),
        TabKind::Users => FormUi::User(UserForm::default()),
        TabKind::Tickets => FormUi::Ticket(TicketForm::add()),
        TabKind::Relations => {
            bail!("relations are created by assigning a device to a user")
        }
        TabKind::Dashboard => return Ok(()),
    };
    open_form(state, runtime, view_data, form)
}

fn open_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    form: FormUi,
) -> Result<()> {
    view_data.user_options = runtime.list_user_options()?;
    view_data.form_cursor = 0;
    state.dispatch(AppCommand::OpenForm(form.kind()));
    view_data.form = Some(form);
    Ok(())
}

fn open_edit_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    if !view_data.detail_stack.is_empty() {
        return Ok(());
    }
    let Some(kind) = state.active_tab.list_kind() else {
        return Ok(());
    };
    let index = view_data.selected_row;
    let snapshot = view_data
        .views
        .get(&kind)
        .and_then(|view| view.snapshot.as_ref());
    let Some(snapshot) = snapshot else {
        bail!("nothing to edit");
    };
    let form = match &snapshot.rows {
        ListRows::Computers(devices) | ListRows::Monitors(devices) => {
            let Some(device) = devices.get(index) else {
                bail!("nothing to edit");
            };
            FormUi::Device(DeviceForm {
                kind: device.kind,
                id: Some(device.id),
                serial_number: device.serial_number.clone(),
                model: device.model.clone(),
                order_id: device.order_id.clone(),
                install_status: device.install_status.as_str().to_owned(),
                user_id: device.user_id,
            })
        }
        ListRows::Users(users) => {
            let Some(user) = users.get(index) else {
                bail!("nothing to edit");
            };
            FormUi::User(UserForm {
                id: Some(user.id),
                name: user.name.clone(),
                email: user.email.clone(),
            })
        }
        ListRows::Tickets(tickets) => {
            let Some(row) = tickets.get(index) else {
                bail!("nothing to edit");
            };
            let Some(detail) = runtime.load_ticket_detail(row.id)? else {
                bail!("ticket {} not found", row.id.get());
            };
            FormUi::Ticket(TicketForm {
                id: Some(detail.ticket.id),
                title: detail.ticket.title.clone(),
                description: detail.ticket.description.clone(),
                status: detail.ticket.status.as_str().to_owned(),
                caller_id: Some(detail.ticket.caller_id),
                assigned_to: detail.ticket.assigned_to,
                estimated_resolution_date: detail
                    .ticket
                    .estimated_resolution_date
                    .map_or_else(String::new, |at| at.date().to_string()),
                resolution_date: detail
                    .ticket
                    .resolution_date
                    .map_or_else(String::new, |at| at.date().to_string()),
            })
        }
        ListRows::Relations(_) => bail!("relations are edited by ending them"),
    };
    open_form(state, runtime, view_data, form)
}

fn open_end_relation_form(state: &mut AppState, view_data: &mut ViewData) -> Result<()> {
    if state.active_tab != TabKind::Relations || !view_data.detail_stack.is_empty() {
        return Ok(());
    }
    let relation = view_data
        .views
        .get(&ListKind::Relations)
        .and_then(|view| view.snapshot.as_ref())
        .and_then(|snapshot| match &snapshot.rows {
            ListRows::Relations(relations) => relations.get(view_data.selected_row).cloned(),
            _ => None,
        });
    let Some(relation) = relation else {
        bail!("no relation selected");
    };
    if relation.end_date.is_some() {
        bail!("relation is already ended");
    }
    let form = FormUi::EndRelation(EndRelationForm {
        relation_id: relation.id,
        start_date: relation.start_date,
        end_date: String::new(),
    });
    view_data.form_cursor = 0;
    state.dispatch(AppCommand::OpenForm(form.kind()));
    view_data.form = Some(form);
    Ok(())
}

fn open_worknote_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    let ticket_id = view_data
        .detail_stack
        .last()
        .and_then(|entry| match &entry.snapshot {
            DetailSnapshot::Ticket(detail) => Some(detail.ticket.id),
            _ => None,
        });
    let Some(ticket_id) = ticket_id else {
        bail!("open a ticket first");
    };
    open_form(state, runtime, view_data, FormUi::Worknote(WorknoteForm::new(ticket_id)))
}

fn delete_selected<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) -> Result<()> {
    if !view_data.detail_stack.is_empty() {
        return Ok(());
    }
    let Some(kind) = state.active_tab.list_kind() else {
        return Ok(());
    };
    let snapshot = view_data
        .views
        .get(&kind)
        .and_then(|view| view.snapshot.as_ref());
    let Some(snapshot) = snapshot else {
        return Ok(());
    };
    let Some(id) = selected_row_id(&snapshot.rows, view_data.selected_row) else {
        return Ok(());
    };
    let submission = match kind {
        ListKind::Computers | ListKind::Monitors => {
            FormSubmission::DeleteDevice(DeviceId::new(id))
        }
        ListKind::Users => FormSubmission::DeleteUser(UserId::new(id)),
        ListKind::Tickets => FormSubmission::DeleteTicket(TicketId::new(id)),
        ListKind::Relations => bail!("relations are ended, not deleted"),
    };
    runtime.submit(&submission)?;
    apply_submission_effects(state, runtime, view_data, &submission);
    emit_status(state, view_data, internal_tx, "deleted");
    Ok(())
}

fn form_field_count(form: &FormUi) -> usize {
    match form {
        FormUi::Device(_) => 5,
        FormUi::User(_) => 2,
        FormUi::Ticket(_) => 7,
        FormUi::Worknote(_) => 2,
        FormUi::EndRelation(_) => 1,
    }
}

fn form_input_char(form: &mut FormUi, cursor: usize, c: char) {
    if let Some(buffer) = text_field_mut(form, cursor) {
        buffer.push(c);
    }
}

fn form_backspace(form: &mut FormUi, cursor: usize) {
    if let Some(buffer) = text_field_mut(form, cursor) {
        buffer.pop();
    }
}

/// The free-text buffer behind a form field, when the field is free-text.
/// Select and picker fields return `None`; an editing device form's serial
/// is display-only and returns `None` too.
fn text_field_mut(form: &mut FormUi, cursor: usize) -> Option<&mut String> {
    match form {
        FormUi::Device(form) => match cursor {
            0 if form.id.is_none() => Some(&mut form.serial_number),
            1 => Some(&mut form.model),
            2 => Some(&mut form.order_id),
            _ => None,
        },
        FormUi::User(form) => match cursor {
            0 => Some(&mut form.name),
            1 => Some(&mut form.email),
            _ => None,
        },
        FormUi::Ticket(form) => match cursor {
            0 => Some(&mut form.title),
            1 => Some(&mut form.description),
            5 => Some(&mut form.estimated_resolution_date),
            6 => Some(&mut form.resolution_date),
            _ => None,
        },
        FormUi::Worknote(form) => match cursor {
            1 => Some(&mut form.note),
            _ => None,
        },
        FormUi::EndRelation(form) => match cursor {
            0 => Some(&mut form.end_date),
            _ => None,
        },
    }
}

fn cycle_form_field(
    form: &mut FormUi,
    cursor: usize,
    delta: isize,
    user_options: &[(UserId, String)],
) {
    match form {
        FormUi::Device(form) => match cursor {
            3 => form.install_status = cycle_option(&form.install_status, &INSTALL_STATUS_OPTIONS, delta),
            4 => form.user_id = cycle_user(form.user_id, user_options, delta, true),
            _ => {}
        },
        FormUi::Ticket(form) => match cursor {
            2 => form.status = cycle_option(&form.status, &TICKET_STATUS_OPTIONS, delta),
            3 => form.caller_id = cycle_user(form.caller_id, user_options, delta, false),
            4 => form.assigned_to = cycle_user(form.assigned_to, user_options, delta, true),
            _ => {}
        },
        FormUi::Worknote(form) => {
            if cursor == 0 {
                form.author_id = cycle_user(form.author_id, user_options, delta, false);
            }
        }
        FormUi::User(_) | FormUi::EndRelation(_) => {}
    }
}

fn cycle_option(current: &str, options: &[&str], delta: isize) -> String {
    let len = options.len() as isize;
    let position = options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(current.trim()))
        .map_or(0, |position| position as isize);
    options[(position + delta).rem_euclid(len) as usize].to_owned()
}

/// Steps through `None` (when allowed) and the options, wrapping.
fn cycle_user(
    current: Option<UserId>,
    options: &[(UserId, String)],
    delta: isize,
    allow_none: bool,
) -> Option<UserId> {
    if options.is_empty() {
        return current;
    }
    let offset = isize::from(allow_none);
    let len = options.len() as isize + offset;
    let position = match current {
        None => 0,
        Some(id) => options
            .iter()
            .position(|(option_id, _)| *option_id == id)
            .map_or(0, |position| position as isize + offset),
    };
    let next = (position + delta).rem_euclid(len);
    if allow_none && next == 0 {
        None
    } else {
        Some(options[(next - offset) as usize].0)
    }
}

fn submission_for(form: &FormUi) -> Result<FormSubmission> {
    match form {
        FormUi::Device(form) => match form.id {
            Some(_) => form
                .validate_update()
                .map(|(id, update)| FormSubmission::UpdateDevice(id, update)),
            None => form.validate_new().map(FormSubmission::CreateDevice),
        },
        FormUi::User(form) => {
            let payload = form.validate()?;
            Ok(match form.id {
                Some(id) => FormSubmission::UpdateUser(id, payload),
                None => FormSubmission::CreateUser(payload),
            })
        }
        FormUi::Ticket(form) => {
            let payload = form.validate()?;
            Ok(match form.id {
                Some(id) => FormSubmission::UpdateTicket(id, payload),
                None => FormSubmission::CreateTicket(payload),
            })
        }
        FormUi::Worknote(form) => form.validate().map(FormSubmission::AddWorknote),
        FormUi::EndRelation(form) => form
            .validate()
            .map(|(id, end_date)| FormSubmission::EndRelation(id, end_date)),
    }
}

fn user_label(options: &[(UserId, String)], id: Option<UserId>) -> String {
    let Some(id) = id else {
        return NULL_PLACEHOLDER.to_owned();
    };
    options
        .iter()
        .find(|(option_id, _)| *option_id == id)
        .map_or_else(|| format!("user {}", id.get()), |(_, email)| email.clone())
}

struct FormFieldView {
    label: &'static str,
    value: String,
}

fn form_field_views(form: &FormUi, options: &[(UserId, String)]) -> Vec<FormFieldView> {
    match form {
        FormUi::Device(form) => vec![
            FormFieldView {
                label: "serial number",
                value: if form.id.is_some() {
                    format!("{} (fixed)", form.serial_number)
                } else {
                    form.serial_number.clone()
                },
            },
            FormFieldView {
                label: "model",
                value: form.model.clone(),
            },
            FormFieldView {
                label: "order id",
                value: form.order_id.clone(),
            },
            FormFieldView {
                label: "install status",
                value: form.install_status.clone(),
            },
            FormFieldView {
                label: "user",
                value: user_label(options, form.user_id),
            },
        ],
        FormUi::User(form) => vec![
            FormFieldView {
                label: "name",
                value: form.name.clone(),
            },
            FormFieldView {
                label: "email",
                value: form.email.clone(),
            },
        ],
        FormUi::Ticket(form) => vec![
            FormFieldView {
                label: "title",
                value: form.title.clone(),
            },
            FormFieldView {
                label: "description",
                value: form.description.clone(),
            },
            FormFieldView {
                label: "status",
                value: form.status.clone(),
            },
            FormFieldView {
                label: "caller",
                value: user_label(options, form.caller_id),
            },
            FormFieldView {
                label: "assigned to",
                value: user_label(options, form.assigned_to),
            },
            FormFieldView {
                label: "estimated resolution date",
                value: form.estimated_resolution_date.clone(),
            },
            FormFieldView {
                label: "resolution date",
                value: form.resolution_date.clone(),
            },
        ],
        FormUi::Worknote(form) => vec![
            FormFieldView {
                label: "author",
                value: user_label(options, form.author_id),
            },
            FormFieldView {
                label: "note",
                value: form.note.clone(),
            },
        ],
        FormUi::EndRelation(form) => vec![FormFieldView {
            label: "end date",
            value: form.end_date.clone(),
        }],
    }
}

fn form_title(form: &FormUi) -> &'static str {
    match form {
        FormUi::Device(form) if form.id.is_some() => "edit device",
        FormUi::Device(_) => "add device",
        FormUi::User(form) if form.id.is_some() => "edit user",
        FormUi::User(_) => "add user",
        FormUi::Ticket(form) if form.id.is_some() => "edit ticket",
        FormUi::Ticket(_) => "add ticket",
        FormUi::Worknote(_) => "add worknote",
        FormUi::EndRelation(_) => "end relation",
    }
}

// ---------------------------------------------------------------------------
// Rendering.

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    if view_data.detail_stack.is_empty() {
        let selected = TabKind::ALL
            .iter()
            .position(|tab| *tab == state.active_tab)
            .unwrap_or(0);
        let tab_titles = TabKind::ALL
            .iter()
            .map(|tab| tab_title(*tab, state))
            .collect::<Vec<String>>();
        let tabs = Tabs::new(tab_titles)
            .block(Block::default().title("fleetdesk").borders(Borders::ALL))
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .select(selected);
        frame.render_widget(tabs, layout[0]);
    } else {
        let breadcrumb = Paragraph::new(breadcrumb_text(state, view_data))
            .block(Block::default().title("fleetdesk").borders(Borders::ALL));
        frame.render_widget(breadcrumb, layout[0]);
    }

    if let Some(entry) = view_data.detail_stack.last() {
        let body = Paragraph::new(render_detail_text(entry)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(entry.title.clone()),
        );
        frame.render_widget(body, layout[1]);
    } else if state.active_tab == TabKind::Dashboard {
        let body = Paragraph::new(render_dashboard_text(&view_data.dashboard_counts))
            .block(Block::default().borders(Borders::ALL).title("dashboard"));
        frame.render_widget(body, layout[1]);
    } else {
        render_list(frame, layout[1], state, view_data);
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(editor) = &view_data.filter_editor {
        let area = centered_rect(64, 22, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(render_filter_text(editor))
            .block(Block::default().title("filter").borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if let Some(form) = &view_data.form {
        let area = centered_rect(64, 56, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(render_form_text(
            form,
            view_data.form_cursor,
            &view_data.user_options,
        ))
        .block(Block::default().title(form_title(form)).borders(Borders::ALL));
        frame.render_widget(widget, area);
    }
}

fn tab_title(tab: TabKind, state: &AppState) -> String {
    let mut title = tab.label().to_owned();
    if let Some(kind) = tab.list_kind() {
        if !state.params(kind).filters.is_empty() {
            title.push_str(" ▼");
        }
    }
    title
}

fn breadcrumb_text(state: &AppState, view_data: &ViewData) -> String {
    let mut parts = vec![state.active_tab.label().to_owned()];
    for entry in &view_data.detail_stack {
        parts.push(entry.title.clone());
    }
    parts.join(" > ")
}

fn render_dashboard_text(counts: &DashboardCounts) -> String {
    [
        format!("deployed devices: {}", counts.deployed_devices),
        format!("open tickets: {}", counts.open_tickets),
        format!("active relations: {}", counts.active_relations),
    ]
    .join("\n")
}

fn render_list(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let Some(kind) = state.active_tab.list_kind() else {
        return;
    };
    let view = view_data.views.get(&kind).cloned().unwrap_or_default();
    let content = table_content(&view, kind, view_data.per_page as usize);

    match content {
        TableContent::Error { message } => {
            let body = Paragraph::new(format!("{message}\n\npress r to retry")).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(state.active_tab.label()),
            );
            frame.render_widget(body, area);
        }
        TableContent::Empty { text } => {
            let body = Paragraph::new(text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(state.active_tab.label()),
            );
            frame.render_widget(body, area);
        }
        TableContent::Loading { columns, slots } => {
            let widths = vec![Constraint::Min(8); columns.len().max(1)];
            let header = Row::new(columns.iter().map(|label| {
                Cell::from(*label).style(
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
            }));
            let rows = (0..slots).map(|_| {
                Row::new(
                    columns
                        .iter()
                        .map(|_| Cell::from(SKELETON_CELL).style(Style::default().fg(Color::DarkGray)))
                        .collect::<Vec<_>>(),
                )
            });
            let table = Table::new(rows, widths).header(header).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{} (loading)", state.active_tab.label())),
            );
            frame.render_widget(table, area);
        }
        TableContent::Rows { projection, stale } => {
            let columns = columns_for(kind);
            let widths = vec![Constraint::Min(8); projection.columns.len().max(1)];
            let header = Row::new(projection.columns.iter().enumerate().map(|(index, label)| {
                let mut text = (*label).to_owned();
                if columns.get(index).is_some_and(|column| column.link.is_some()) {
                    text.push(' ');
                    text.push_str(LINK_ARROW);
                }
                Cell::from(text).style(
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
            }));
            let rows = projection.rows.iter().enumerate().map(|(row_index, cells)| {
                let selected_row = row_index == view_data.selected_row;
                Row::new(
                    cells
                        .iter()
                        .enumerate()
                        .map(|(column_index, cell)| {
                            let mut style = Style::default();
                            if *cell == TableCell::Missing {
                                style = style.fg(Color::DarkGray);
                            }
                            if selected_row {
                                style = style.bg(Color::DarkGray);
                            }
                            if selected_row && column_index == view_data.selected_col {
                                style = Style::default()
                                    .fg(Color::Black)
                                    .bg(Color::Cyan)
                                    .add_modifier(Modifier::BOLD);
                            }
                            Cell::from(cell.display()).style(style)
                        })
                        .collect::<Vec<_>>(),
                )
            });

            let total = view.snapshot.as_ref().map_or(0, |snapshot| snapshot.total);
            let pages = total_pages(total, view_data.per_page);
            let current = state.params(kind).page;
            let mut title = format!("{} ({total})", state.active_tab.label());
            if stale {
                title.push_str(" (loading)");
            }
            let mut block = Block::default().borders(Borders::ALL).title(title);
            let footer = pagination_line(current, pages);
            if !footer.is_empty() {
                block = block.title_bottom(footer);
            }
            let table = Table::new(rows, widths)
                .header(header)
                .column_spacing(1)
                .block(block);
            frame.render_widget(table, area);
        }
    }
}

fn render_detail_text(entry: &DetailEntry) -> String {
    match &entry.snapshot {
        DetailSnapshot::Device(detail) => {
            let device = &detail.device;
            let mut lines = vec![
                format!("serial number: {}", device.serial_number),
                format!("model: {}", device.model),
                format!("order id: {}", device.order_id),
                format!("status: {}", device.install_status.as_str()),
                String::new(),
                "assignment history:".to_owned(),
            ];
            if detail.history.is_empty() {
                lines.push("  (never assigned)".to_owned());
            }
            for relation in &detail.history {
                let end = relation
                    .end_date
                    .map_or_else(|| "active".to_owned(), |date| date.to_string());
                lines.push(format!(
                    "  {} {} {}  {}",
                    relation.start_date, LINK_ARROW, end, relation.user.email
                ));
            }
            lines.join("\n")
        }
        DetailSnapshot::Ticket(detail) => {
            let ticket = &detail.ticket;
            let mut lines = vec![
                format!("number: {}", ticket.number),
                format!("title: {}", ticket.title),
                format!("status: {}", ticket.status.as_str()),
                format!(
                    "caller: {}",
                    detail
                        .caller
                        .as_ref()
                        .map_or(NULL_PLACEHOLDER, |caller| caller.email.as_str())
                ),
                format!(
                    "assigned to: {}",
                    detail
                        .assigned_to
                        .as_ref()
                        .map_or(NULL_PLACEHOLDER, |assignee| assignee.email.as_str())
                ),
                format!("description: {}", ticket.description),
                String::new(),
                "worknotes (w to add):".to_owned(),
            ];
            if detail.worknotes.is_empty() {
                lines.push("  (none yet)".to_owned());
            }
            for note in &detail.worknotes {
                let author = note
                    .author
                    .as_ref()
                    .map_or(NULL_PLACEHOLDER, |author| author.email.as_str());
                lines.push(format!("  {}  {}: {}", note.created_at.date(), author, note.note));
            }
            lines.join("\n")
        }
        DetailSnapshot::User(detail) => {
            let mut lines = vec![
                format!("name: {}", detail.user.name),
                format!("email: {}", detail.user.email),
                String::new(),
                "devices:".to_owned(),
            ];
            if detail.devices.is_empty() {
                lines.push("  (none)".to_owned());
            }
            for device in &detail.devices {
                lines.push(format!("  {}  {}", device.serial_number, device.model));
            }
            lines.push(String::new());
            lines.push("tickets:".to_owned());
            if detail.tickets.is_empty() {
                lines.push("  (none)".to_owned());
            }
            for ticket in &detail.tickets {
                lines.push(format!(
                    "  #{}  {}  {}",
                    ticket.number,
                    ticket.status.as_str(),
                    ticket.title
                ));
            }
            lines.join("\n")
        }
        DetailSnapshot::NotFound { noun, id } => {
            format!("No {noun} with id {id}.\n\nPress Esc to go back.")
        }
    }
}

fn render_filter_text(editor: &FilterEditor) -> String {
    let columns = columns_for(editor.kind);
    let fields = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            if index == editor.column {
                format!("[{}]", column.label)
            } else {
                column.label.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    [
        fields,
        String::new(),
        format!("value: {}_", editor.value),
        String::new(),
        "←/→ field · comma separates OR terms · Enter apply · Esc cancel".to_owned(),
    ]
    .join("\n")
}

fn render_form_text(form: &FormUi, cursor: usize, options: &[(UserId, String)]) -> String {
    let mut lines = Vec::new();
    for (index, field) in form_field_views(form, options).iter().enumerate() {
        let marker = if index == cursor { ">" } else { " " };
        lines.push(format!("{marker} {}: {}", field.label, field.value));
    }
    lines.push(String::new());
    lines.push("↑/↓ field · ←/→ choice · Enter save · Esc cancel".to_owned());
    lines.join("\n")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(message) = &state.status_line {
        return message.clone();
    }
    if !view_data.detail_stack.is_empty() {
        return "Esc back · w worknote (ticket) · q quit".to_owned();
    }
    match state.mode {
        AppMode::Nav => {
            "tab/h/l tabs · j/k rows · n/p page · / filter · a add · e edit · d delete · Enter open · q quit"
                .to_owned()
        }
        AppMode::Filter => "filter".to_owned(),
        AppMode::Form(_) => "form".to_owned(),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
