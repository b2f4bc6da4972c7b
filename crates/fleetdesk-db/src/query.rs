// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Dynamic WHERE-clause assembly for the entity list queries. Filter values
//! hold comma-separated terms; terms on one field OR together and distinct
//! fields AND together. Text terms prefix-match case-insensitively, enum
//! terms resolve by label containment, date terms cover one calendar day,
//! and the literal term `null` matches unset optional dates.

use anyhow::{Result, bail};
use fleetdesk_app::{FilterSet, InstallStatus, TicketStatus};
use rusqlite::types::Value;
use time::Date;
use time::macros::format_description;

pub const DEFAULT_PER_PAGE: u64 = 20;

/// One page of list results plus the exact unpaginated total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
        }
    }
}

/// List request: 1-based page, page size, active filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub per_page: u64,
    pub filters: FilterSet,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            filters: FilterSet::default(),
        }
    }
}

impl ListQuery {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.per_page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Text,
    InstallStatus,
    TicketStatus,
    /// RFC3339 timestamp column; a term is a calendar day, expanded to the
    /// half-open UTC day range. `null` matches unset values.
    DateTime,
    /// Plain `YYYY-MM-DD` column; a term matches by equality.
    DateOnly,
    /// All-digit terms match exactly, anything else prefix-matches the
    /// text rendering.
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldSpec {
    /// Public filter key as the column config exposes it.
    pub field: &'static str,
    /// Qualified SQL column the clause targets.
    pub column: &'static str,
    pub kind: FieldKind,
}

pub(crate) const DEVICE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: "serial_number",
        column: "d.serial_number",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "model",
        column: "d.model",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "order_id",
        column: "d.order_id",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "install_status",
        column: "d.install_status",
        kind: FieldKind::InstallStatus,
    },
    FieldSpec {
        field: "created_at",
        column: "d.created_at",
        kind: FieldKind::DateTime,
    },
];

pub(crate) const USER_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: "name",
        column: "u.name",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "email",
        column: "u.email",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "created_at",
        column: "u.created_at",
        kind: FieldKind::DateTime,
    },
];

pub(crate) const TICKET_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: "number",
        column: "t.number",
        kind: FieldKind::Number,
    },
    FieldSpec {
        field: "title",
        column: "t.title",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "status",
        column: "t.status",
        kind: FieldKind::TicketStatus,
    },
    FieldSpec {
        field: "caller.email",
        column: "c.email",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "assigned_to.email",
        column: "a.email",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "created_at",
        column: "t.created_at",
        kind: FieldKind::DateTime,
    },
    FieldSpec {
        field: "estimated_resolution_date",
        column: "t.estimated_resolution_date",
        kind: FieldKind::DateTime,
    },
    FieldSpec {
        field: "resolution_date",
        column: "t.resolution_date",
        kind: FieldKind::DateTime,
    },
];

pub(crate) const RELATION_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: "device.serial_number",
        column: "d.serial_number",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "device.model",
        column: "d.model",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "user.email",
        column: "u.email",
        kind: FieldKind::Text,
    },
    FieldSpec {
        field: "start_date",
        column: "r.start_date",
        kind: FieldKind::DateOnly,
    },
    FieldSpec {
        field: "end_date",
        column: "r.end_date",
        kind: FieldKind::DateOnly,
    },
];

/// Assembled WHERE fragment. `always_empty` is the deliberate sentinel for
/// a filter none of whose terms resolved to anything; the caller returns an
/// empty page without touching the database.
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    pub clauses: Vec<String>,
    pub params: Vec<Value>,
    /// Qualified columns that carry an active filter; used to tighten
    /// optional joins to INNER.
    pub filtered_columns: Vec<&'static str>,
    pub always_empty: bool,
}

impl WhereClause {
    pub fn filters_column_prefix(&self, prefix: &str) -> bool {
        self.filtered_columns
            .iter()
            .any(|column| column.starts_with(prefix))
    }
}

pub(crate) fn build_where(filters: &FilterSet, fields: &[FieldSpec]) -> Result<WhereClause> {
    let mut built = WhereClause::default();

    for filter in filters.iter() {
        let Some(spec) = fields.iter().find(|spec| spec.field == filter.field) else {
            bail!("unknown filter field {:?}", filter.field);
        };

        let terms = filter.terms();
        if terms.is_empty() {
            continue;
        }

        let mut alternatives = Vec::new();
        for term in &terms {
            if let Some(sql) = term_clause(spec, term, &mut built.params) {
                alternatives.push(sql);
            }
        }

        if alternatives.is_empty() {
            // Every term failed to resolve (unknown enum label, bad date).
            built.always_empty = true;
            return Ok(built);
        }

        built.filtered_columns.push(spec.column);
        built.clauses.push(if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            format!("({})", alternatives.join(" OR "))
        });
    }

    Ok(built)
}

fn term_clause(spec: &FieldSpec, term: &str, params: &mut Vec<Value>) -> Option<String> {
    match spec.kind {
        FieldKind::Text => {
            params.push(Value::Text(prefix_pattern(term)));
            Some(format!("{} LIKE ? ESCAPE '\\'", spec.column))
        }
        FieldKind::InstallStatus => {
            let matched = InstallStatus::matching(term);
            if matched.is_empty() {
                return None;
            }
            let placeholders = vec!["?"; matched.len()].join(", ");
            for status in matched {
                params.push(Value::Text(status.as_str().to_owned()));
            }
            Some(format!("{} IN ({placeholders})", spec.column))
        }
        FieldKind::TicketStatus => {
            let matched = TicketStatus::matching(term);
            if matched.is_empty() {
                return None;
            }
            let placeholders = vec!["?"; matched.len()].join(", ");
            for status in matched {
                params.push(Value::Text(status.as_str().to_owned()));
            }
            Some(format!("{} IN ({placeholders})", spec.column))
        }
        FieldKind::DateTime => {
            if term.eq_ignore_ascii_case("null") {
                return Some(format!("{} IS NULL", spec.column));
            }
            let day = parse_day(term)?;
            let next = day.next_day()?;
            params.push(Value::Text(day_floor(day)));
            params.push(Value::Text(day_floor(next)));
            Some(format!("({0} >= ? AND {0} < ?)", spec.column))
        }
        FieldKind::DateOnly => {
            if term.eq_ignore_ascii_case("null") {
                return Some(format!("{} IS NULL", spec.column));
            }
            let day = parse_day(term)?;
            params.push(Value::Text(format_day(day)));
            Some(format!("{} = ?", spec.column))
        }
        FieldKind::Number => {
            if !term.is_empty() && term.bytes().all(|byte| byte.is_ascii_digit()) {
                params.push(Value::Integer(term.parse().ok()?));
                Some(format!("{} = ?", spec.column))
            } else {
                params.push(Value::Text(prefix_pattern(term)));
                Some(format!("CAST({} AS TEXT) LIKE ? ESCAPE '\\'", spec.column))
            }
        }
    }
}

fn prefix_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 1);
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn parse_day(term: &str) -> Option<Date> {
    Date::parse(term, &format_description!("[year]-[month]-[day]")).ok()
}

fn format_day(day: Date) -> String {
    day.format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}

/// Stored timestamps are UTC RFC3339 with a trailing `Z`, so these bounds
/// compare lexicographically in chronological order.
fn day_floor(day: Date) -> String {
    format!("{}T00:00:00Z", format_day(day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdesk_app::Filter;

    fn filters(entries: &[(&str, &str)]) -> FilterSet {
        entries
            .iter()
            .map(|(field, value)| Filter::new(*field, *value))
            .collect()
    }

    #[test]
    fn terms_or_within_a_field_and_fields_and_together() {
        let built = build_where(
            &filters(&[("model", "HP,Dell"), ("serial_number", "SN")]),
            DEVICE_FIELDS,
        )
        .unwrap();

        assert_eq!(
            built.clauses,
            vec![
                "(d.model LIKE ? ESCAPE '\\' OR d.model LIKE ? ESCAPE '\\')".to_owned(),
                "d.serial_number LIKE ? ESCAPE '\\'".to_owned(),
            ]
        );
        assert_eq!(
            built.params,
            vec![
                Value::Text("HP%".to_owned()),
                Value::Text("Dell%".to_owned()),
                Value::Text("SN%".to_owned()),
            ]
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        let built = build_where(&filters(&[("model", "100%_x")]), DEVICE_FIELDS).unwrap();
        assert_eq!(built.params, vec![Value::Text("100\\%\\_x%".to_owned())]);
    }

    #[test]
    fn enum_terms_resolve_by_containment() {
        let built = build_where(&filters(&[("install_status", "deploy")]), DEVICE_FIELDS).unwrap();
        assert_eq!(built.clauses, vec!["d.install_status IN (?)".to_owned()]);
        assert_eq!(built.params, vec![Value::Text("Deployed".to_owned())]);
    }

    #[test]
    fn unresolvable_enum_term_short_circuits_to_empty() {
        let built = build_where(&filters(&[("install_status", "zzz")]), DEVICE_FIELDS).unwrap();
        assert!(built.always_empty);
    }

    #[test]
    fn mixed_enum_terms_keep_the_resolved_ones() {
        let built =
            build_where(&filters(&[("install_status", "zzz,disposed")]), DEVICE_FIELDS).unwrap();
        assert!(!built.always_empty);
        assert_eq!(built.params, vec![Value::Text("Disposed".to_owned())]);
    }

    #[test]
    fn timestamp_terms_expand_to_a_utc_day_range() {
        let built = build_where(&filters(&[("created_at", "2026-03-05")]), DEVICE_FIELDS).unwrap();
        assert_eq!(
            built.clauses,
            vec!["(d.created_at >= ? AND d.created_at < ?)".to_owned()]
        );
        assert_eq!(
            built.params,
            vec![
                Value::Text("2026-03-05T00:00:00Z".to_owned()),
                Value::Text("2026-03-06T00:00:00Z".to_owned()),
            ]
        );
    }

    #[test]
    fn null_term_matches_unset_dates() {
        let built = build_where(&filters(&[("end_date", "null")]), RELATION_FIELDS).unwrap();
        assert_eq!(built.clauses, vec!["r.end_date IS NULL".to_owned()]);
        assert!(built.params.is_empty());
    }

    #[test]
    fn ticket_number_is_exact_for_digits_and_prefix_otherwise() {
        let built = build_where(&filters(&[("number", "42")]), TICKET_FIELDS).unwrap();
        assert_eq!(built.clauses, vec!["t.number = ?".to_owned()]);
        assert_eq!(built.params, vec![Value::Integer(42)]);

        let built = build_where(&filters(&[("number", "4x")]), TICKET_FIELDS).unwrap();
        assert_eq!(
            built.clauses,
            vec!["CAST(t.number AS TEXT) LIKE ? ESCAPE '\\'".to_owned()]
        );
    }

    #[test]
    fn filtered_joined_column_is_reported() {
        let built =
            build_where(&filters(&[("assigned_to.email", "bob")]), TICKET_FIELDS).unwrap();
        assert!(built.filters_column_prefix("a."));
        assert!(!built.filters_column_prefix("c."));
    }

    #[test]
    fn unknown_filter_field_is_an_error() {
        assert!(build_where(&filters(&[("nope", "x")]), DEVICE_FIELDS).is_err());
    }

    #[test]
    fn offset_is_page_minus_one_times_per_page() {
        let query = ListQuery {
            page: 5,
            per_page: 20,
            ..ListQuery::default()
        };
        assert_eq!(query.offset(), 80);
        assert_eq!(ListQuery::default().offset(), 0);
    }
}
