// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Static column descriptors driving both the table renderer and the filter
//! editor. Field paths are dot-nested and resolved against the row at render
//! time; a cell whose path resolves to nothing renders the `None` placeholder.

use crate::model::{InstallStatus, ListKind, TicketStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Select(&'static [&'static str]),
    Date,
}

/// Where a link-bearing cell navigates. `DeviceByKind` is row-dependent:
/// the target is the computer or monitor detail depending on the row's
/// device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Computer,
    Monitor,
    User,
    Ticket,
    DeviceByKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub kind: LinkKind,
    /// Dot-nested path to the id the detail view is opened with.
    pub id_field: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub label: &'static str,
    pub input: InputKind,
    pub link: Option<Link>,
}

pub const INSTALL_STATUS_OPTIONS: [&str; 4] = [
    InstallStatus::Deployed.as_str(),
    InstallStatus::InInventory.as_str(),
    InstallStatus::EndOfLife.as_str(),
    InstallStatus::Disposed.as_str(),
];

pub const TICKET_STATUS_OPTIONS: [&str; 5] = [
    TicketStatus::New.as_str(),
    TicketStatus::InProgress.as_str(),
    TicketStatus::OnHold.as_str(),
    TicketStatus::Resolved.as_str(),
    TicketStatus::Cancelled.as_str(),
];

pub const COMPUTER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "serial_number",
        label: "Serial Number",
        input: InputKind::Text,
        link: Some(Link {
            kind: LinkKind::Computer,
            id_field: "id",
        }),
    },
    ColumnSpec {
        field: "model",
        label: "Model",
        input: InputKind::Text,
        link: None,
    },
    ColumnSpec {
        field: "order_id",
        label: "Order ID",
        input: InputKind::Text,
        link: None,
    },
    ColumnSpec {
        field: "install_status",
        label: "Status",
        input: InputKind::Select(&INSTALL_STATUS_OPTIONS),
        link: None,
    },
];

pub const MONITOR_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "serial_number",
        label: "Serial Number",
        input: InputKind::Text,
        link: Some(Link {
            kind: LinkKind::Monitor,
            id_field: "id",
        }),
    },
    ColumnSpec {
        field: "model",
        label: "Model",
        input: InputKind::Text,
        link: None,
    },
    ColumnSpec {
        field: "order_id",
        label: "Order ID",
        input: InputKind::Text,
        link: None,
    },
    ColumnSpec {
        field: "install_status",
        label: "Status",
        input: InputKind::Select(&INSTALL_STATUS_OPTIONS),
        link: None,
    },
];

pub const USER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "name",
        label: "Name",
        input: InputKind::Text,
        link: Some(Link {
            kind: LinkKind::User,
            id_field: "id",
        }),
    },
    ColumnSpec {
        field: "email",
        label: "Email",
        input: InputKind::Text,
        link: None,
    },
];

pub const TICKET_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "number",
        label: "Number",
        input: InputKind::Text,
        link: Some(Link {
            kind: LinkKind::Ticket,
            id_field: "id",
        }),
    },
    ColumnSpec {
        field: "title",
        label: "Title",
        input: InputKind::Text,
        link: None,
    },
    ColumnSpec {
        field: "status",
        label: "Status",
        input: InputKind::Select(&TICKET_STATUS_OPTIONS),
        link: None,
    },
    ColumnSpec {
        field: "caller.email",
        label: "Caller",
        input: InputKind::Text,
        link: Some(Link {
            kind: LinkKind::User,
            id_field: "caller.id",
        }),
    },
    ColumnSpec {
        field: "assigned_to.email",
        label: "Assigned To",
        input: InputKind::Text,
        link: Some(Link {
            kind: LinkKind::User,
            id_field: "assigned_to.id",
        }),
    },
    ColumnSpec {
        field: "created_at",
        label: "Created",
        input: InputKind::Date,
        link: None,
    },
];

pub const RELATION_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        field: "device.serial_number",
        label: "Device Serial",
        input: InputKind::Text,
        link: Some(Link {
            kind: LinkKind::DeviceByKind,
            id_field: "device.id",
        }),
    },
    ColumnSpec {
        field: "device.model",
        label: "Device Model",
        input: InputKind::Text,
        link: None,
    },
    ColumnSpec {
        field: "user.email",
        label: "User",
        input: InputKind::Text,
        link: Some(Link {
            kind: LinkKind::User,
            id_field: "user.id",
        }),
    },
    ColumnSpec {
        field: "start_date",
        label: "Start Date",
        input: InputKind::Date,
        link: None,
    },
    ColumnSpec {
        field: "end_date",
        label: "End Date",
        input: InputKind::Date,
        link: None,
    },
];

pub const fn columns_for(kind: ListKind) -> &'static [ColumnSpec] {
    match kind {
        ListKind::Computers => COMPUTER_COLUMNS,
        ListKind::Monitors => MONITOR_COLUMNS,
        ListKind::Users => USER_COLUMNS,
        ListKind::Tickets => TICKET_COLUMNS,
        ListKind::Relations => RELATION_COLUMNS,
    }
}
