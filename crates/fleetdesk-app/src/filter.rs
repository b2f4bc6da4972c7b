// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ListKind;

/// Reserved list-params key; never part of the filter set.
pub const PAGE_KEY: &str = "page";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Comma-separated terms, trimmed, empties dropped. Terms on one field
    /// OR together; distinct fields AND together.
    pub fn terms(&self) -> Vec<&str> {
        self.value
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .collect()
    }
}

/// Ordered set of active filters, one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|filter| filter.field == field)
            .map(|filter| filter.value.as_str())
    }

    /// Replaces the filter for `field`, appending if absent. An empty value
    /// removes it. The reserved `page` key is not a filter and is ignored.
    pub fn set(&mut self, field: &str, value: &str) {
        if field == PAGE_KEY {
            return;
        }
        if value.trim().is_empty() {
            self.filters.retain(|filter| filter.field != field);
            return;
        }
        match self.filters.iter_mut().find(|filter| filter.field == field) {
            Some(filter) => filter.value = value.to_string(),
            None => self.filters.push(Filter::new(field, value)),
        }
    }

    pub fn remove(&mut self, field: &str) {
        self.filters.retain(|filter| filter.field != field);
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        let mut set = Self::default();
        for filter in iter {
            set.set(&filter.field, &filter.value);
        }
        set
    }
}

/// Per-tab list position: the page plus the active filters. Stands in for
/// the query string of a list page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListParams {
    pub page: u64,
    pub filters: FilterSet,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            filters: FilterSet::default(),
        }
    }
}

impl ListParams {
    /// Changing any filter resets the page to 1.
    pub fn set_filter(&mut self, field: &str, value: &str) {
        self.filters.set(field, value);
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.page = 1;
    }

    /// Changing the page preserves the filters.
    pub fn set_page(&mut self, page: u64) {
        self.page = page.max(1);
    }
}

/// Identity of one list fetch; equal keys are served from cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub kind: ListKind,
    pub page: u64,
    pub filters: FilterSet,
}

impl QueryKey {
    pub fn new(kind: ListKind, params: &ListParams) -> Self {
        Self {
            kind,
            page: params.page,
            filters: params.filters.clone(),
        }
    }
}

/// Keyed cache of fetched list results. Mutations invalidate every key for
/// the touched entity; other entities keep their entries.
#[derive(Debug, Default)]
pub struct ListCache<V> {
    entries: HashMap<QueryKey, V>,
}

impl<V> ListCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: QueryKey, value: V) {
        self.entries.insert(key, value);
    }

    pub fn invalidate(&mut self, kind: ListKind) {
        self.entries.retain(|key, _| key.kind != kind);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
