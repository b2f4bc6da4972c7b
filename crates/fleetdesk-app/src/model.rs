// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Computer,
    Monitor,
}

impl DeviceKind {
    pub const ALL: [Self; 2] = [Self::Computer, Self::Monitor];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Computer => "computer",
            Self::Monitor => "monitor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "computer" => Some(Self::Computer),
            "monitor" => Some(Self::Monitor),
            _ => None,
        }
    }

    pub const fn noun(self) -> &'static str {
        match self {
            Self::Computer => "computer",
            Self::Monitor => "monitor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallStatus {
    Deployed,
    InInventory,
    EndOfLife,
    Disposed,
}

impl InstallStatus {
    pub const ALL: [Self; 4] = [
        Self::Deployed,
        Self::InInventory,
        Self::EndOfLife,
        Self::Disposed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deployed => "Deployed",
            Self::InInventory => "In Inventory",
            Self::EndOfLife => "End of Life",
            Self::Disposed => "Disposed",
        }
    }

    /// Case-insensitive: the source data carries both "In Inventory" and the
    /// add-form spelling "In inventory".
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }

    /// Resolve a filter term to statuses whose label contains it,
    /// case-insensitively ("deploy" matches Deployed).
    pub fn matching(term: &str) -> Vec<Self> {
        let needle = term.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        Self::ALL
            .into_iter()
            .filter(|status| status.as_str().to_ascii_lowercase().contains(&needle))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    New,
    InProgress,
    OnHold,
    Resolved,
    Cancelled,
}

impl TicketStatus {
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::InProgress,
        Self::OnHold,
        Self::Resolved,
        Self::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::OnHold => "On Hold",
            Self::Resolved => "Resolved",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }

    pub fn matching(term: &str) -> Vec<Self> {
        let needle = term.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        Self::ALL
            .into_iter()
            .filter(|status| status.as_str().to_ascii_lowercase().contains(&needle))
            .collect()
    }

    pub const fn is_open(self) -> bool {
        matches!(self, Self::New | Self::InProgress | Self::OnHold)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub serial_number: String,
    pub model: String,
    pub order_id: String,
    pub install_status: InstallStatus,
    pub user_id: Option<UserId>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: OffsetDateTime,
}

/// Joined user projection carried by ticket/relation/worknote rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub email: String,
}

/// Joined device projection carried by relation rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    pub id: DeviceId,
    pub serial_number: String,
    pub model: String,
    pub kind: DeviceKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub number: i64,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub caller_id: UserId,
    pub assigned_to: Option<UserId>,
    pub created_at: OffsetDateTime,
    pub estimated_resolution_date: Option<OffsetDateTime>,
    pub resolution_date: Option<OffsetDateTime>,
}

/// Ticket row as the list view consumes it, with caller/assignee flattened
/// into email-bearing references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketView {
    pub id: TicketId,
    pub number: i64,
    pub title: String,
    pub status: TicketStatus,
    pub caller: Option<UserRef>,
    pub assigned_to: Option<UserRef>,
    pub created_at: OffsetDateTime,
    pub estimated_resolution_date: Option<OffsetDateTime>,
    pub resolution_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worknote {
    pub id: WorknoteId,
    pub ticket_id: TicketId,
    pub author_id: UserId,
    pub note: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorknoteView {
    pub id: WorknoteId,
    pub note: String,
    pub created_at: OffsetDateTime,
    pub author: Option<UserRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub device_id: DeviceId,
    pub user_id: UserId,
    pub start_date: Date,
    pub end_date: Option<Date>,
}

impl Relation {
    pub const fn is_active(&self) -> bool {
        self.end_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationView {
    pub id: RelationId,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub user: UserRef,
    pub device: DeviceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DashboardCounts {
    pub deployed_devices: usize,
    pub open_tickets: usize,
    pub active_relations: usize,
}

/// Entities that have a list view; the cache and the query builder key on
/// this, not on the tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Computers,
    Monitors,
    Users,
    Tickets,
    Relations,
}

impl ListKind {
    pub const ALL: [Self; 5] = [
        Self::Computers,
        Self::Monitors,
        Self::Users,
        Self::Tickets,
        Self::Relations,
    ];

    /// Singular noun used in empty-state text ("No computers found").
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Computers => "computer",
            Self::Monitors => "monitor",
            Self::Users => "user",
            Self::Tickets => "ticket",
            Self::Relations => "relation",
        }
    }

    pub const fn device_kind(self) -> Option<DeviceKind> {
        match self {
            Self::Computers => Some(DeviceKind::Computer),
            Self::Monitors => Some(DeviceKind::Monitor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Dashboard,
    Computers,
    Monitors,
    Users,
    Tickets,
    Relations,
}

impl TabKind {
    pub const ALL: [Self; 6] = [
        Self::Dashboard,
        Self::Computers,
        Self::Monitors,
        Self::Users,
        Self::Tickets,
        Self::Relations,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Computers => "computers",
            Self::Monitors => "monitors",
            Self::Users => "users",
            Self::Tickets => "tickets",
            Self::Relations => "relations",
        }
    }

    pub const fn list_kind(self) -> Option<ListKind> {
        match self {
            Self::Dashboard => None,
            Self::Computers => Some(ListKind::Computers),
            Self::Monitors => Some(ListKind::Monitors),
            Self::Users => Some(ListKind::Users),
            Self::Tickets => Some(ListKind::Tickets),
            Self::Relations => Some(ListKind::Relations),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Device,
    User,
    Ticket,
    Worknote,
    EndRelation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Filter,
    Form(FormKind),
}

#[cfg(test)]
mod tests {
    use super::{DeviceKind, InstallStatus, ListKind, TabKind, TicketStatus};

    #[test]
    fn install_status_round_trips_through_storage_strings() {
        for status in InstallStatus::ALL {
            assert_eq!(InstallStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn install_status_parse_tolerates_form_spelling() {
        assert_eq!(
            InstallStatus::parse("In inventory"),
            Some(InstallStatus::InInventory)
        );
        assert_eq!(InstallStatus::parse("deployed"), Some(InstallStatus::Deployed));
        assert_eq!(InstallStatus::parse("retired"), None);
    }

    #[test]
    fn install_status_term_resolution_is_containment_based() {
        assert_eq!(
            InstallStatus::matching("deploy"),
            vec![InstallStatus::Deployed]
        );
        assert_eq!(
            InstallStatus::matching("inventory"),
            vec![InstallStatus::InInventory]
        );
        assert!(InstallStatus::matching("xyz").is_empty());
        assert!(InstallStatus::matching("  ").is_empty());
    }

    #[test]
    fn ticket_status_matching_can_hit_several_values() {
        // "o" appears in On Hold, Resolved, In Progress and Cancelled labels.
        let matches = TicketStatus::matching("re");
        assert!(matches.contains(&TicketStatus::InProgress));
        assert!(matches.contains(&TicketStatus::Resolved));
    }

    #[test]
    fn open_ticket_statuses() {
        assert!(TicketStatus::New.is_open());
        assert!(TicketStatus::OnHold.is_open());
        assert!(!TicketStatus::Resolved.is_open());
        assert!(!TicketStatus::Cancelled.is_open());
    }

    #[test]
    fn device_kind_round_trip_and_tab_mapping() {
        for kind in DeviceKind::ALL {
            assert_eq!(DeviceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TabKind::Computers.list_kind(), Some(ListKind::Computers));
        assert_eq!(
            ListKind::Monitors.device_kind(),
            Some(DeviceKind::Monitor)
        );
        assert_eq!(TabKind::Dashboard.list_kind(), None);
    }
}
