// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use fleetdesk_app::{
    DashboardCounts, Device, DeviceId, DeviceKind, DeviceRef, DeviceUpdate, InstallStatus,
    NewDevice, NewWorknote, Relation, RelationId, RelationView, Ticket, TicketId, TicketPayload,
    TicketStatus, TicketView, User, UserId, UserPayload, UserRef, Worknote, WorknoteId,
    WorknoteView,
};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

mod query;

pub use query::{DEFAULT_PER_PAGE, ListQuery, Page};
use query::{DEVICE_FIELDS, RELATION_FIELDS, TICKET_FIELDS, USER_FIELDS, build_where};

pub const APP_NAME: &str = "fleetdesk";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("users", &["id", "name", "email", "created_at"]),
    (
        "devices",
        &[
            "id",
            "device_type",
            "serial_number",
            "model",
            "order_id",
            "install_status",
            "user_id",
            "created_at",
        ],
    ),
    (
        "tickets",
        &[
            "id",
            "number",
            "title",
            "description",
            "status",
            "caller_id",
            "assigned_to",
            "created_at",
            "estimated_resolution_date",
            "resolution_date",
        ],
    ),
    (
        "worknotes",
        &["id", "ticket_id", "author_id", "note", "created_at"],
    ),
    (
        "relations",
        &["id", "device_id", "user_id", "start_date", "end_date"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_users_email",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email);",
    },
    RequiredIndex {
        name: "idx_devices_serial_number",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_devices_serial_number ON devices (serial_number);",
    },
    RequiredIndex {
        name: "idx_tickets_number",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_tickets_number ON tickets (number);",
    },
    RequiredIndex {
        name: "idx_devices_user_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_devices_user_id ON devices (user_id);",
    },
    RequiredIndex {
        name: "idx_tickets_caller_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_tickets_caller_id ON tickets (caller_id);",
    },
    RequiredIndex {
        name: "idx_tickets_assigned_to",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_tickets_assigned_to ON tickets (assigned_to);",
    },
    RequiredIndex {
        name: "idx_worknotes_ticket_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_worknotes_ticket_id ON worknotes (ticket_id);",
    },
    RequiredIndex {
        name: "idx_relations_device_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_relations_device_id ON relations (device_id);",
    },
    RequiredIndex {
        name: "idx_relations_user_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_relations_user_id ON relations (user_id);",
    },
    RequiredIndex {
        name: "idx_relations_active_device",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_relations_active_device ON relations (device_id) WHERE end_date IS NULL;",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupValue<Id> {
    pub id: Id,
    pub name: String,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;
        Ok(())
    }

    // --- devices ---

    pub fn list_devices(&self, kind: DeviceKind, query: &ListQuery) -> Result<Page<Device>> {
        let built = build_where(&query.filters, DEVICE_FIELDS)?;
        if built.always_empty {
            return Ok(Page::empty());
        }

        let mut sql = String::from(
            "
            SELECT
              d.id, d.device_type, d.serial_number, d.model, d.order_id,
              d.install_status, d.user_id, d.created_at
            FROM devices d
            WHERE d.device_type = ?
            ",
        );
        for clause in &built.clauses {
            sql.push_str("  AND ");
            sql.push_str(clause);
            sql.push('\n');
        }

        let mut where_params = vec![rusqlite::types::Value::Text(kind.as_str().to_owned())];
        where_params.extend(built.params);

        let total = self.count_page(&sql, &where_params)?;
        sql.push_str("ORDER BY d.serial_number ASC LIMIT ? OFFSET ?");

        let mut page_params = where_params;
        page_params.push(rusqlite::types::Value::Integer(query.per_page as i64));
        page_params.push(rusqlite::types::Value::Integer(query.offset() as i64));

        let mut stmt = self.conn.prepare(&sql).context("prepare devices query")?;
        let rows = stmt
            .query_map(params_from_iter(page_params), row_to_device)
            .context("query devices")?;
        let rows = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect devices")?;

        Ok(Page { rows, total })
    }

    pub fn get_device(&self, device_id: DeviceId) -> Result<Option<Device>> {
        self.conn
            .query_row(
                "
                SELECT
                  d.id, d.device_type, d.serial_number, d.model, d.order_id,
                  d.install_status, d.user_id, d.created_at
                FROM devices d
                WHERE d.id = ?
                ",
                params![device_id.get()],
                row_to_device,
            )
            .optional()
            .with_context(|| format!("load device {}", device_id.get()))
    }

    pub fn create_device(&self, new_device: &NewDevice) -> Result<DeviceId> {
        if new_device.install_status == InstallStatus::Deployed && new_device.user_id.is_none() {
            bail!("a Deployed device must have an assigned user");
        }

        let now = now_rfc3339()?;
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "
            INSERT INTO devices (
              device_type, serial_number, model, order_id,
              install_status, user_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                new_device.kind.as_str(),
                new_device.serial_number,
                new_device.model,
                new_device.order_id,
                new_device.install_status.as_str(),
                new_device.user_id.map(UserId::get),
                now,
            ],
        );
        match inserted {
            Err(error) if is_unique_violation(&error) => {
                bail!(
                    "a device with serial number {:?} already exists",
                    new_device.serial_number
                );
            }
            other => {
                other.context("insert device")?;
            }
        }
        let device_id = DeviceId::new(tx.last_insert_rowid());

        if let Some(user_id) = new_device.user_id {
            tx.execute(
                "INSERT INTO relations (device_id, user_id, start_date) VALUES (?, ?, ?)",
                params![device_id.get(), user_id.get(), today_utc()],
            )
            .context("open assignment for new device")?;
        }

        tx.commit().context("commit device insert")?;
        Ok(device_id)
    }

    /// Applies the edit and keeps assignment history consistent in one
    /// transaction: when the assigned user changes, the previous active
    /// relation is ended today and a new one opens for the new user.
    pub fn update_device(&self, device_id: DeviceId, update: &DeviceUpdate) -> Result<()> {
        if update.install_status == InstallStatus::Deployed && update.user_id.is_none() {
            bail!("a Deployed device must have an assigned user");
        }

        let tx = self.conn.unchecked_transaction()?;
        let previous_user: Option<Option<i64>> = tx
            .query_row(
                "SELECT user_id FROM devices WHERE id = ?",
                params![device_id.get()],
                |row| row.get(0),
            )
            .optional()
            .context("load device before update")?;
        let Some(previous_user) = previous_user else {
            bail!("device {} not found", device_id.get());
        };

        tx.execute(
            "
            UPDATE devices
            SET model = ?, order_id = ?, install_status = ?, user_id = ?
            WHERE id = ?
            ",
            params![
                update.model,
                update.order_id,
                update.install_status.as_str(),
                update.user_id.map(UserId::get),
                device_id.get(),
            ],
        )
        .context("update device")?;

        let next_user = update.user_id.map(UserId::get);
        if next_user != previous_user {
            let today = today_utc();
            tx.execute(
                "UPDATE relations SET end_date = ? WHERE device_id = ? AND end_date IS NULL",
                params![today, device_id.get()],
            )
            .context("end previous assignment")?;
            if let Some(user_id) = next_user {
                tx.execute(
                    "INSERT INTO relations (device_id, user_id, start_date) VALUES (?, ?, ?)",
                    params![device_id.get(), user_id, today],
                )
                .context("open new assignment")?;
            }
        }

        tx.commit().context("commit device update")
    }

    pub fn delete_device(&self, device_id: DeviceId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM devices WHERE id = ?", params![device_id.get()])
            .context("delete device")?;
        if rows_affected == 0 {
            bail!("device {} not found", device_id.get());
        }
        Ok(())
    }

    /// Assignment history for one device, newest first.
    pub fn device_history(&self, device_id: DeviceId) -> Result<Vec<RelationView>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  r.id, r.start_date, r.end_date,
                  u.id, u.email,
                  d.id, d.serial_number, d.model, d.device_type
                FROM relations r
                JOIN users u ON u.id = r.user_id
                JOIN devices d ON d.id = r.device_id
                WHERE r.device_id = ?
                ORDER BY r.start_date DESC, r.id DESC
                ",
            )
            .context("prepare device history query")?;
        let rows = stmt
            .query_map(params![device_id.get()], row_to_relation_view)
            .context("query device history")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect device history")
    }

    // --- users ---

    pub fn list_users(&self, query: &ListQuery) -> Result<Page<User>> {
        let built = build_where(&query.filters, USER_FIELDS)?;
        if built.always_empty {
            return Ok(Page::empty());
        }

        let mut sql = String::from(
            "
            SELECT u.id, u.name, u.email, u.created_at
            FROM users u
            WHERE 1 = 1
            ",
        );
        for clause in &built.clauses {
            sql.push_str("  AND ");
            sql.push_str(clause);
            sql.push('\n');
        }

        let total = self.count_page(&sql, &built.params)?;
        sql.push_str("ORDER BY u.name ASC LIMIT ? OFFSET ?");

        let mut page_params = built.params;
        page_params.push(rusqlite::types::Value::Integer(query.per_page as i64));
        page_params.push(rusqlite::types::Value::Integer(query.offset() as i64));

        let mut stmt = self.conn.prepare(&sql).context("prepare users query")?;
        let rows = stmt
            .query_map(params_from_iter(page_params), row_to_user)
            .context("query users")?;
        let rows = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect users")?;

        Ok(Page { rows, total })
    }

    pub fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT u.id, u.name, u.email, u.created_at FROM users u WHERE u.id = ?",
                params![user_id.get()],
                row_to_user,
            )
            .optional()
            .with_context(|| format!("load user {}", user_id.get()))
    }

    /// Users for the assignment pickers, keyed by email.
    pub fn list_user_options(&self) -> Result<Vec<LookupValue<UserId>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email FROM users ORDER BY email ASC")
            .context("prepare user options query")?;
        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                Ok(LookupValue {
                    id: UserId::new(id),
                    name,
                })
            })
            .context("query user options")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect user options")
    }

    pub fn create_user(&self, user: &UserPayload) -> Result<UserId> {
        let now = now_rfc3339()?;
        let inserted = self.conn.execute(
            "INSERT INTO users (name, email, created_at) VALUES (?, ?, ?)",
            params![user.name, user.email, now],
        );
        match inserted {
            Err(error) if is_unique_violation(&error) => {
                bail!("a user with email {:?} already exists", user.email);
            }
            other => {
                other.context("insert user")?;
            }
        }
        Ok(UserId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_user(&self, user_id: UserId, update: &UserPayload) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE users SET name = ?, email = ? WHERE id = ?",
            params![update.name, update.email, user_id.get()],
        );
        let rows_affected = match updated {
            Err(error) if is_unique_violation(&error) => {
                bail!("a user with email {:?} already exists", update.email);
            }
            other => other.context("update user")?,
        };
        if rows_affected == 0 {
            bail!("user {} not found", user_id.get());
        }
        Ok(())
    }

    /// Refused while anything still references the user.
    pub fn delete_user(&self, user_id: UserId) -> Result<()> {
        let references: i64 = self
            .conn
            .query_row(
                "
                SELECT
                  (SELECT COUNT(*) FROM devices WHERE user_id = ?1)
                  + (SELECT COUNT(*) FROM tickets WHERE caller_id = ?1 OR assigned_to = ?1)
                  + (SELECT COUNT(*) FROM relations WHERE user_id = ?1)
                  + (SELECT COUNT(*) FROM worknotes WHERE author_id = ?1)
                ",
                params![user_id.get()],
                |row| row.get(0),
            )
            .context("count user references")?;
        if references > 0 {
            bail!(
                "user {} still has devices, tickets, relations, or worknotes; reassign or remove those first",
                user_id.get()
            );
        }

        let rows_affected = self
            .conn
            .execute("DELETE FROM users WHERE id = ?", params![user_id.get()])
            .context("delete user")?;
        if rows_affected == 0 {
            bail!("user {} not found", user_id.get());
        }
        Ok(())
    }

    /// Devices currently assigned to the user.
    pub fn user_devices(&self, user_id: UserId) -> Result<Vec<Device>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  d.id, d.device_type, d.serial_number, d.model, d.order_id,
                  d.install_status, d.user_id, d.created_at
                FROM devices d
                WHERE d.user_id = ?
                ORDER BY d.serial_number ASC
                ",
            )
            .context("prepare user devices query")?;
        let rows = stmt
            .query_map(params![user_id.get()], row_to_device)
            .context("query user devices")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect user devices")
    }

    /// Tickets the user called in or is assigned to, newest first.
    pub fn user_tickets(&self, user_id: UserId) -> Result<Vec<Ticket>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  t.id, t.number, t.title, t.description, t.status,
                  t.caller_id, t.assigned_to, t.created_at,
                  t.estimated_resolution_date, t.resolution_date
                FROM tickets t
                WHERE t.caller_id = ?1 OR t.assigned_to = ?1
                ORDER BY t.created_at DESC, t.id DESC
                ",
            )
            .context("prepare user tickets query")?;
        let rows = stmt
            .query_map(params![user_id.get()], row_to_ticket)
            .context("query user tickets")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect user tickets")
    }

    // --- tickets ---

    pub fn list_tickets(&self, query: &ListQuery) -> Result<Page<TicketView>> {
        let built = build_where(&query.filters, TICKET_FIELDS)?;
        if built.always_empty {
            return Ok(Page::empty());
        }

        // The assignee is optional, so its join stays LEFT unless that
        // field is actively filtered.
        let assigned_join = if built.filters_column_prefix("a.") {
            "JOIN"
        } else {
            "LEFT JOIN"
        };

        let mut sql = format!(
            "
            SELECT
              t.id, t.number, t.title, t.status,
              c.id, c.email,
              a.id, a.email,
              t.created_at, t.estimated_resolution_date, t.resolution_date
            FROM tickets t
            JOIN users c ON c.id = t.caller_id
            {assigned_join} users a ON a.id = t.assigned_to
            WHERE 1 = 1
            ",
        );
        for clause in &built.clauses {
            sql.push_str("  AND ");
            sql.push_str(clause);
            sql.push('\n');
        }

        let total = self.count_page(&sql, &built.params)?;
        sql.push_str("ORDER BY t.title ASC LIMIT ? OFFSET ?");

        let mut page_params = built.params;
        page_params.push(rusqlite::types::Value::Integer(query.per_page as i64));
        page_params.push(rusqlite::types::Value::Integer(query.offset() as i64));

        let mut stmt = self.conn.prepare(&sql).context("prepare tickets query")?;
        let rows = stmt
            .query_map(params_from_iter(page_params), row_to_ticket_view)
            .context("query tickets")?;
        let rows = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect tickets")?;

        Ok(Page { rows, total })
    }

    pub fn get_ticket(&self, ticket_id: TicketId) -> Result<Option<Ticket>> {
        self.conn
            .query_row(
                "
                SELECT
                  t.id, t.number, t.title, t.description, t.status,
                  t.caller_id, t.assigned_to, t.created_at,
                  t.estimated_resolution_date, t.resolution_date
                FROM tickets t
                WHERE t.id = ?
                ",
                params![ticket_id.get()],
                row_to_ticket,
            )
            .optional()
            .with_context(|| format!("load ticket {}", ticket_id.get()))
    }

    /// The ticket number is assigned here, one past the current maximum,
    /// and never changes afterwards.
    pub fn create_ticket(&self, ticket: &TicketPayload) -> Result<TicketId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO tickets (
                  number, title, description, status, caller_id, assigned_to,
                  created_at, estimated_resolution_date, resolution_date
                ) VALUES (
                  (SELECT COALESCE(MAX(number), 0) + 1 FROM tickets),
                  ?, ?, ?, ?, ?, ?, ?, ?
                )
                ",
                params![
                    ticket.title,
                    ticket.description,
                    ticket.status.as_str(),
                    ticket.caller_id.get(),
                    ticket.assigned_to.map(UserId::get),
                    now,
                    ticket.estimated_resolution_date.map(day_start_rfc3339),
                    ticket.resolution_date.map(day_start_rfc3339),
                ],
            )
            .context("insert ticket")?;
        Ok(TicketId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_ticket(&self, ticket_id: TicketId, update: &TicketPayload) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE tickets
                SET
                  title = ?,
                  description = ?,
                  status = ?,
                  caller_id = ?,
                  assigned_to = ?,
                  estimated_resolution_date = ?,
                  resolution_date = ?
                WHERE id = ?
                ",
                params![
                    update.title,
                    update.description,
                    update.status.as_str(),
                    update.caller_id.get(),
                    update.assigned_to.map(UserId::get),
                    update.estimated_resolution_date.map(day_start_rfc3339),
                    update.resolution_date.map(day_start_rfc3339),
                    ticket_id.get(),
                ],
            )
            .context("update ticket")?;
        if rows_affected == 0 {
            bail!("ticket {} not found", ticket_id.get());
        }
        Ok(())
    }

    pub fn delete_ticket(&self, ticket_id: TicketId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM tickets WHERE id = ?", params![ticket_id.get()])
            .context("delete ticket")?;
        if rows_affected == 0 {
            bail!("ticket {} not found", ticket_id.get());
        }
        Ok(())
    }

    // --- worknotes ---

    pub fn add_worknote(&self, worknote: &NewWorknote) -> Result<WorknoteId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "INSERT INTO worknotes (ticket_id, author_id, note, created_at) VALUES (?, ?, ?, ?)",
                params![
                    worknote.ticket_id.get(),
                    worknote.author_id.get(),
                    worknote.note,
                    now,
                ],
            )
            .context("insert worknote")?;
        Ok(WorknoteId::new(self.conn.last_insert_rowid()))
    }

    /// Worknotes for one ticket, newest first. Append-only; there is no
    /// update or delete.
    pub fn list_worknotes(&self, ticket_id: TicketId) -> Result<Vec<WorknoteView>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT w.id, w.note, w.created_at, u.id, u.email
                FROM worknotes w
                LEFT JOIN users u ON u.id = w.author_id
                WHERE w.ticket_id = ?
                ORDER BY w.created_at DESC, w.id DESC
                ",
            )
            .context("prepare worknotes query")?;
        let rows = stmt
            .query_map(params![ticket_id.get()], |row| {
                let created_at_raw: String = row.get(2)?;
                let author_id: Option<i64> = row.get(3)?;
                let author_email: Option<String> = row.get(4)?;
                Ok(WorknoteView {
                    id: WorknoteId::new(row.get(0)?),
                    note: row.get(1)?,
                    created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                    author: author_id.zip(author_email).map(|(id, email)| UserRef {
                        id: UserId::new(id),
                        email,
                    }),
                })
            })
            .context("query worknotes")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect worknotes")
    }

    // --- relations ---

    pub fn list_relations(&self, query: &ListQuery) -> Result<Page<RelationView>> {
        let built = build_where(&query.filters, RELATION_FIELDS)?;
        if built.always_empty {
            return Ok(Page::empty());
        }

        let mut sql = String::from(
            "
            SELECT
              r.id, r.start_date, r.end_date,
              u.id, u.email,
              d.id, d.serial_number, d.model, d.device_type
            FROM relations r
            JOIN users u ON u.id = r.user_id
            JOIN devices d ON d.id = r.device_id
            WHERE 1 = 1
            ",
        );
        for clause in &built.clauses {
            sql.push_str("  AND ");
            sql.push_str(clause);
            sql.push('\n');
        }

        let total = self.count_page(&sql, &built.params)?;
        sql.push_str("ORDER BY d.serial_number ASC, r.id DESC LIMIT ? OFFSET ?");

        let mut page_params = built.params;
        page_params.push(rusqlite::types::Value::Integer(query.per_page as i64));
        page_params.push(rusqlite::types::Value::Integer(query.offset() as i64));

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare relations query")?;
        let rows = stmt
            .query_map(params_from_iter(page_params), row_to_relation_view)
            .context("query relations")?;
        let rows = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect relations")?;

        Ok(Page { rows, total })
    }

    pub fn get_relation(&self, relation_id: RelationId) -> Result<Option<Relation>> {
        self.conn
            .query_row(
                "
                SELECT r.id, r.device_id, r.user_id, r.start_date, r.end_date
                FROM relations r
                WHERE r.id = ?
                ",
                params![relation_id.get()],
                |row| {
                    let start_date_raw: String = row.get(3)?;
                    let end_date_raw: Option<String> = row.get(4)?;
                    Ok(Relation {
                        id: RelationId::new(row.get(0)?),
                        device_id: DeviceId::new(row.get(1)?),
                        user_id: UserId::new(row.get(2)?),
                        start_date: parse_date(&start_date_raw).map_err(to_sql_error)?,
                        end_date: end_date_raw
                            .as_deref()
                            .map(parse_date)
                            .transpose()
                            .map_err(to_sql_error)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load relation {}", relation_id.get()))
    }

    pub fn end_relation(&self, relation_id: RelationId, end_date: Date) -> Result<()> {
        let Some(relation) = self.get_relation(relation_id)? else {
            bail!("relation {} not found", relation_id.get());
        };
        if relation.end_date.is_some() {
            bail!("relation {} is already ended", relation_id.get());
        }
        if end_date < relation.start_date {
            bail!("end date must not be before the start date");
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE relations SET end_date = ? WHERE id = ?",
            params![format_date(end_date), relation_id.get()],
        )
        .context("end relation")?;
        // An ended assignment also clears the device's current user.
        tx.execute(
            "UPDATE devices SET user_id = NULL WHERE id = ? AND user_id = ?",
            params![relation.device_id.get(), relation.user_id.get()],
        )
        .context("clear device assignment")?;
        tx.commit().context("commit relation end")
    }

    // --- dashboard ---

    pub fn dashboard_counts(&self) -> Result<DashboardCounts> {
        let deployed_devices: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM devices WHERE install_status = ?",
                params![InstallStatus::Deployed.as_str()],
                |row| row.get(0),
            )
            .context("count deployed devices")?;
        let open_tickets: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM tickets WHERE status IN (?, ?, ?)",
                params![
                    TicketStatus::New.as_str(),
                    TicketStatus::InProgress.as_str(),
                    TicketStatus::OnHold.as_str(),
                ],
                |row| row.get(0),
            )
            .context("count open tickets")?;
        let active_relations: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM relations WHERE end_date IS NULL",
                [],
                |row| row.get(0),
            )
            .context("count active relations")?;

        Ok(DashboardCounts {
            deployed_devices: deployed_devices as usize,
            open_tickets: open_tickets as usize,
            active_relations: active_relations as usize,
        })
    }

    // --- demo data ---

    pub fn seed_demo_data(&self) -> Result<()> {
        const DEMO_USERS: &[(&str, &str)] = &[
            ("Ada Lovelace", "ada@fleetdesk.test"),
            ("Grace Hopper", "grace@fleetdesk.test"),
            ("Alan Turing", "alan@fleetdesk.test"),
            ("Edsger Dijkstra", "edsger@fleetdesk.test"),
            ("Barbara Liskov", "barbara@fleetdesk.test"),
        ];
        let mut user_ids = Vec::new();
        for (name, email) in DEMO_USERS {
            user_ids.push(self.create_user(&UserPayload {
                name: (*name).to_owned(),
                email: (*email).to_owned(),
            })?);
        }

        const DEMO_DEVICES: &[(DeviceKind, &str, &str, &str, InstallStatus, Option<usize>)] = &[
            (DeviceKind::Computer, "CMP-1001", "ThinkPad X1", "ORD-301", InstallStatus::Deployed, Some(0)),
            (DeviceKind::Computer, "CMP-1002", "MacBook Pro 14", "ORD-301", InstallStatus::Deployed, Some(1)),
            (DeviceKind::Computer, "CMP-1003", "ThinkPad T14", "ORD-302", InstallStatus::InInventory, None),
            (DeviceKind::Computer, "CMP-1004", "Dell XPS 13", "ORD-303", InstallStatus::EndOfLife, None),
            (DeviceKind::Monitor, "MON-2001", "Dell U2723QE", "ORD-304", InstallStatus::Deployed, Some(0)),
            (DeviceKind::Monitor, "MON-2002", "LG 27UP850", "ORD-304", InstallStatus::InInventory, None),
            (DeviceKind::Monitor, "MON-2003", "HP Z27", "ORD-305", InstallStatus::Disposed, None),
        ];
        for (kind, serial, model, order, status, user_index) in DEMO_DEVICES {
            self.create_device(&NewDevice {
                kind: *kind,
                serial_number: (*serial).to_owned(),
                model: (*model).to_owned(),
                order_id: (*order).to_owned(),
                install_status: *status,
                user_id: user_index.map(|index| user_ids[index]),
            })?;
        }

        const DEMO_TICKETS: &[(&str, &str, TicketStatus, usize, Option<usize>)] = &[
            ("Laptop will not boot", "Black screen after the firmware update.", TicketStatus::New, 0, Some(2)),
            ("Monitor flickers", "Flickers at 60Hz over USB-C.", TicketStatus::InProgress, 1, Some(2)),
            ("Docking station missing", "Desk 14 has no dock since the office move.", TicketStatus::OnHold, 3, None),
            ("Keyboard replacement", "Two keys unresponsive.", TicketStatus::Resolved, 4, Some(2)),
        ];
        let mut ticket_ids = Vec::new();
        for (title, description, status, caller, assigned) in DEMO_TICKETS {
            ticket_ids.push(self.create_ticket(&TicketPayload {
                title: (*title).to_owned(),
                description: (*description).to_owned(),
                status: *status,
                caller_id: user_ids[*caller],
                assigned_to: assigned.map(|index| user_ids[index]),
                estimated_resolution_date: None,
                resolution_date: None,
            })?);
        }

        self.add_worknote(&NewWorknote {
            ticket_id: ticket_ids[1],
            author_id: user_ids[2],
            note: "Reproduced with the original cable; ordering a replacement.".to_owned(),
        })?;
        self.add_worknote(&NewWorknote {
            ticket_id: ticket_ids[3],
            author_id: user_ids[2],
            note: "Keyboard swapped, closing.".to_owned(),
        })?;

        Ok(())
    }

    fn count_page(&self, from_where_sql: &str, params: &[rusqlite::types::Value]) -> Result<u64> {
        let count_sql = format!("SELECT COUNT(*) FROM ({from_where_sql})");
        let total: i64 = self
            .conn
            .query_row(
                &count_sql,
                params_from_iter(params.iter().cloned()),
                |row| row.get(0),
            )
            .context("count list total")?;
        Ok(total as u64)
    }
}

fn row_to_device(row: &rusqlite::Row<'_>) -> rusqlite::Result<Device> {
    let kind_raw: String = row.get(1)?;
    let kind = DeviceKind::parse(&kind_raw)
        .ok_or_else(|| to_sql_error(anyhow!("unknown device type {kind_raw:?}")))?;
    let status_raw: String = row.get(5)?;
    let install_status = InstallStatus::parse(&status_raw)
        .ok_or_else(|| to_sql_error(anyhow!("unknown install status {status_raw:?}")))?;
    let user_id: Option<i64> = row.get(6)?;
    let created_at_raw: String = row.get(7)?;

    Ok(Device {
        id: DeviceId::new(row.get(0)?),
        kind,
        serial_number: row.get(2)?,
        model: row.get(3)?,
        order_id: row.get(4)?,
        install_status,
        user_id: user_id.map(UserId::new),
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_at_raw: String = row.get(3)?;
    Ok(User {
        id: UserId::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
    })
}

fn row_to_ticket(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    let status_raw: String = row.get(4)?;
    let status = TicketStatus::parse(&status_raw)
        .ok_or_else(|| to_sql_error(anyhow!("unknown ticket status {status_raw:?}")))?;
    let assigned_to: Option<i64> = row.get(6)?;
    let created_at_raw: String = row.get(7)?;
    let estimated_raw: Option<String> = row.get(8)?;
    let resolution_raw: Option<String> = row.get(9)?;

    Ok(Ticket {
        id: TicketId::new(row.get(0)?),
        number: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status,
        caller_id: UserId::new(row.get(5)?),
        assigned_to: assigned_to.map(UserId::new),
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        estimated_resolution_date: parse_opt_datetime(estimated_raw).map_err(to_sql_error)?,
        resolution_date: parse_opt_datetime(resolution_raw).map_err(to_sql_error)?,
    })
}

fn row_to_ticket_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<TicketView> {
    let status_raw: String = row.get(3)?;
    let status = TicketStatus::parse(&status_raw)
        .ok_or_else(|| to_sql_error(anyhow!("unknown ticket status {status_raw:?}")))?;
    let caller_id: Option<i64> = row.get(4)?;
    let caller_email: Option<String> = row.get(5)?;
    let assigned_id: Option<i64> = row.get(6)?;
    let assigned_email: Option<String> = row.get(7)?;
    let created_at_raw: String = row.get(8)?;
    let estimated_raw: Option<String> = row.get(9)?;
    let resolution_raw: Option<String> = row.get(10)?;

    Ok(TicketView {
        id: TicketId::new(row.get(0)?),
        number: row.get(1)?,
        title: row.get(2)?,
        status,
        caller: caller_id.zip(caller_email).map(|(id, email)| UserRef {
            id: UserId::new(id),
            email,
        }),
        assigned_to: assigned_id.zip(assigned_email).map(|(id, email)| UserRef {
            id: UserId::new(id),
            email,
        }),
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        estimated_resolution_date: parse_opt_datetime(estimated_raw).map_err(to_sql_error)?,
        resolution_date: parse_opt_datetime(resolution_raw).map_err(to_sql_error)?,
    })
}

fn row_to_relation_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<RelationView> {
    let start_date_raw: String = row.get(1)?;
    let end_date_raw: Option<String> = row.get(2)?;
    let device_kind_raw: String = row.get(8)?;
    let device_kind = DeviceKind::parse(&device_kind_raw)
        .ok_or_else(|| to_sql_error(anyhow!("unknown device type {device_kind_raw:?}")))?;

    Ok(RelationView {
        id: RelationId::new(row.get(0)?),
        start_date: parse_date(&start_date_raw).map_err(to_sql_error)?,
        end_date: end_date_raw
            .as_deref()
            .map(parse_date)
            .transpose()
            .map_err(to_sql_error)?,
        user: UserRef {
            id: UserId::new(row.get(3)?),
            email: row.get(4)?,
        },
        device: DeviceRef {
            id: DeviceId::new(row.get(5)?),
            serial_number: row.get(6)?,
            model: row.get(7)?,
            kind: device_kind,
        },
    })
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("FLEETDESK_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set FLEETDESK_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("fleetdesk.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a fleetdesk-compatible database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn today_utc() -> String {
    format_date(OffsetDateTime::now_utc().date())
}

fn day_start_rfc3339(day: Date) -> String {
    format!("{}T00:00:00Z", format_date(day))
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = OffsetDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_date(raw: &str) -> Result<Date> {
    if let Ok(value) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Ok(value);
    }

    // Imported data sometimes stores dates as full timestamps.
    let date_time = parse_datetime(raw)?;
    Ok(date_time.date())
}

fn parse_opt_datetime(raw: Option<String>) -> Result<Option<OffsetDateTime>> {
    raw.as_deref().map(parse_datetime).transpose()
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}

fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}
