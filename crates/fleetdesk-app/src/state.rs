// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;

use crate::filter::ListParams;
use crate::model::{AppMode, FormKind, ListKind, TabKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_tab: TabKind,
    pub status_line: Option<String>,
    params: HashMap<ListKind, ListParams>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_tab: TabKind::Dashboard,
            status_line: None,
            params: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    EnterFilterMode,
    ExitToNav,
    OpenForm(FormKind),
    SetFilter { field: String, value: String },
    ClearFilters,
    GoToPage(u64),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TabChanged(TabKind),
    /// The list params for this entity changed; its view must refetch.
    ParamsChanged(ListKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    /// List params of the active tab; `None` on the dashboard.
    pub fn active_params(&self) -> Option<&ListParams> {
        let kind = self.active_tab.list_kind()?;
        Some(self.params(kind))
    }

    pub fn params(&self, kind: ListKind) -> &ListParams {
        static DEFAULT: std::sync::OnceLock<ListParams> = std::sync::OnceLock::new();
        self.params
            .get(&kind)
            .unwrap_or_else(|| DEFAULT.get_or_init(ListParams::default))
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::EnterFilterMode => {
                self.mode = AppMode::Filter;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::OpenForm(kind) => {
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SetFilter { field, value } => self.with_active_params(|params| {
                params.set_filter(&field, &value);
            }),
            AppCommand::ClearFilters => self.with_active_params(ListParams::clear_filters),
            AppCommand::GoToPage(page) => self.with_active_params(|params| {
                params.set_page(page);
            }),
            AppCommand::SetStatus(message) => {
                vec![self.set_status(&message)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn with_active_params(&mut self, apply: impl FnOnce(&mut ListParams)) -> Vec<AppEvent> {
        let Some(kind) = self.active_tab.list_kind() else {
            return Vec::new();
        };
        let params = self.params.entry(kind).or_default();
        apply(params);
        vec![AppEvent::ParamsChanged(kind)]
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        let tabs = TabKind::ALL;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_tab = tabs[next];
        vec![AppEvent::TabChanged(self.active_tab)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
