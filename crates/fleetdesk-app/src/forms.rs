// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Add/edit form state and the payloads it validates into. Validation runs
//! before anything touches the store; messages are user-facing. Immutable
//! fields (device serial, ticket number) are absent from the update payloads
//! so an edit can never carry them.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

use crate::ids::{DeviceId, RelationId, TicketId, UserId};
use crate::model::{DeviceKind, InstallStatus, TicketStatus};

const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

fn parse_form_date(label: &str, value: &str) -> Result<Date> {
    match Date::parse(value.trim(), DATE_FORMAT) {
        Ok(date) => Ok(date),
        Err(_) => bail!("{label} must be a date in YYYY-MM-DD form"),
    }
}

fn parse_optional_date(label: &str, value: &str) -> Result<Option<Date>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_form_date(label, value).map(Some)
}

/// Crude shape check, not delivery verification.
fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDevice {
    pub kind: DeviceKind,
    pub serial_number: String,
    pub model: String,
    pub order_id: String,
    pub install_status: InstallStatus,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    pub model: String,
    pub order_id: String,
    pub install_status: InstallStatus,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceForm {
    pub kind: DeviceKind,
    /// `Some` when editing; the serial field is then display-only.
    pub id: Option<DeviceId>,
    pub serial_number: String,
    pub model: String,
    pub order_id: String,
    pub install_status: String,
    pub user_id: Option<UserId>,
}

impl DeviceForm {
    pub fn add(kind: DeviceKind) -> Self {
        Self {
            kind,
            id: None,
            serial_number: String::new(),
            model: String::new(),
            order_id: String::new(),
            install_status: "In inventory".to_string(),
            user_id: None,
        }
    }

    pub fn edit(kind: DeviceKind, id: DeviceId) -> Self {
        Self {
            id: Some(id),
            ..Self::add(kind)
        }
    }

    fn validate_common(&self) -> Result<(InstallStatus, Option<UserId>)> {
        if self.model.trim().is_empty() {
            bail!("Model is required");
        }
        if self.order_id.trim().is_empty() {
            bail!("Order ID is required");
        }
        let Some(status) = InstallStatus::parse(self.install_status.trim()) else {
            bail!("Install status must be one of the listed values");
        };
        if status == InstallStatus::Deployed && self.user_id.is_none() {
            bail!("User is required when status is Deployed");
        }
        // Moving off Deployed always submits a cleared user.
        let user_id = if status == InstallStatus::Deployed {
            self.user_id
        } else {
            None
        };
        Ok((status, user_id))
    }

    pub fn validate_new(&self) -> Result<NewDevice> {
        if self.serial_number.trim().is_empty() {
            bail!("Serial number is required");
        }
        let (install_status, user_id) = self.validate_common()?;
        Ok(NewDevice {
            kind: self.kind,
            serial_number: self.serial_number.trim().to_string(),
            model: self.model.trim().to_string(),
            order_id: self.order_id.trim().to_string(),
            install_status,
            user_id,
        })
    }

    pub fn validate_update(&self) -> Result<(DeviceId, DeviceUpdate)> {
        let Some(id) = self.id else {
            bail!("Device form has no id to update");
        };
        let (install_status, user_id) = self.validate_common()?;
        Ok((
            id,
            DeviceUpdate {
                model: self.model.trim().to_string(),
                order_id: self.order_id.trim().to_string(),
                install_status,
                user_id,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
}

impl UserForm {
    pub fn validate(&self) -> Result<UserPayload> {
        if self.name.trim().is_empty() {
            bail!("Name is required");
        }
        let email = self.email.trim();
        if email.is_empty() {
            bail!("Email is required");
        }
        if !looks_like_email(email) {
            bail!("Email must be a valid address");
        }
        Ok(UserPayload {
            name: self.name.trim().to_string(),
            email: email.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPayload {
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub caller_id: UserId,
    pub assigned_to: Option<UserId>,
    pub estimated_resolution_date: Option<Date>,
    pub resolution_date: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketForm {
    pub id: Option<TicketId>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub caller_id: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub estimated_resolution_date: String,
    pub resolution_date: String,
}

impl TicketForm {
    pub fn add() -> Self {
        Self {
            id: None,
            title: String::new(),
            description: String::new(),
            status: TicketStatus::New.as_str().to_string(),
            caller_id: None,
            assigned_to: None,
            estimated_resolution_date: String::new(),
            resolution_date: String::new(),
        }
    }

    pub fn validate(&self) -> Result<TicketPayload> {
        if self.title.trim().is_empty() {
            bail!("Title is required");
        }
        let Some(status) = TicketStatus::parse(self.status.trim()) else {
            bail!("Status must be one of the listed values");
        };
        let Some(caller_id) = self.caller_id else {
            bail!("Caller is required");
        };
        Ok(TicketPayload {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            status,
            caller_id,
            assigned_to: self.assigned_to,
            estimated_resolution_date: parse_optional_date(
                "Estimated resolution date",
                &self.estimated_resolution_date,
            )?,
            resolution_date: parse_optional_date("Resolution date", &self.resolution_date)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorknote {
    pub ticket_id: TicketId,
    pub author_id: UserId,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorknoteForm {
    pub ticket_id: TicketId,
    pub author_id: Option<UserId>,
    pub note: String,
}

impl WorknoteForm {
    pub fn new(ticket_id: TicketId) -> Self {
        Self {
            ticket_id,
            author_id: None,
            note: String::new(),
        }
    }

    pub fn validate(&self) -> Result<NewWorknote> {
        if self.note.trim().is_empty() {
            bail!("Note is required");
        }
        let Some(author_id) = self.author_id else {
            bail!("Author is required");
        };
        Ok(NewWorknote {
            ticket_id: self.ticket_id,
            author_id,
            note: self.note.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndRelationForm {
    pub relation_id: RelationId,
    pub start_date: Date,
    pub end_date: String,
}

impl EndRelationForm {
    pub fn validate(&self) -> Result<(RelationId, Date)> {
        let end_date = parse_form_date("End date", &self.end_date)?;
        if end_date < self.start_date {
            bail!("End date must not be before the start date");
        }
        Ok((self.relation_id, end_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn add_device_defaults_produce_the_expected_payload() {
        let mut form = DeviceForm::add(DeviceKind::Computer);
        form.serial_number = "SN123".to_string();
        form.model = "HP".to_string();
        form.order_id = "ORDER-9".to_string();

        let payload = form.validate_new().unwrap();
        assert_eq!(
            payload,
            NewDevice {
                kind: DeviceKind::Computer,
                serial_number: "SN123".to_string(),
                model: "HP".to_string(),
                order_id: "ORDER-9".to_string(),
                install_status: InstallStatus::InInventory,
                user_id: None,
            }
        );
    }

    #[test]
    fn deployed_requires_a_user() {
        let mut form = DeviceForm::add(DeviceKind::Computer);
        form.serial_number = "SN1".to_string();
        form.model = "HP".to_string();
        form.order_id = "O1".to_string();
        form.install_status = "Deployed".to_string();

        let err = form.validate_new().unwrap_err();
        assert!(err.to_string().contains("User is required"));

        form.user_id = Some(UserId::new(7));
        assert_eq!(form.validate_new().unwrap().user_id, Some(UserId::new(7)));
    }

    #[test]
    fn moving_off_deployed_clears_the_user() {
        let mut form = DeviceForm::edit(DeviceKind::Monitor, DeviceId::new(3));
        form.model = "Dell U2723".to_string();
        form.order_id = "O2".to_string();
        form.install_status = "In Inventory".to_string();
        form.user_id = Some(UserId::new(7));

        let (id, update) = form.validate_update().unwrap();
        assert_eq!(id, DeviceId::new(3));
        assert_eq!(update.user_id, None);
        assert_eq!(update.install_status, InstallStatus::InInventory);
    }

    #[test]
    fn missing_required_device_fields_fail_in_order() {
        let form = DeviceForm::add(DeviceKind::Computer);
        assert!(
            form.validate_new()
                .unwrap_err()
                .to_string()
                .contains("Serial number")
        );
    }

    #[test]
    fn user_email_shape_is_checked() {
        let mut form = UserForm {
            id: None,
            name: "Ada".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(
            form.validate()
                .unwrap_err()
                .to_string()
                .contains("valid address")
        );

        form.email = "ada@example.com".to_string();
        assert_eq!(form.validate().unwrap().email, "ada@example.com");
    }

    #[test]
    fn ticket_needs_title_and_caller() {
        let mut form = TicketForm::add();
        form.title = "Broken screen".to_string();
        assert!(
            form.validate()
                .unwrap_err()
                .to_string()
                .contains("Caller is required")
        );

        form.caller_id = Some(UserId::new(1));
        form.estimated_resolution_date = "2026-09-01".to_string();
        let payload = form.validate().unwrap();
        assert_eq!(payload.status, TicketStatus::New);
        assert_eq!(
            payload.estimated_resolution_date,
            Some(date!(2026 - 09 - 01))
        );
    }

    #[test]
    fn bad_form_dates_are_rejected() {
        let mut form = TicketForm::add();
        form.title = "t".to_string();
        form.caller_id = Some(UserId::new(1));
        form.resolution_date = "09/01/2026".to_string();
        assert!(
            form.validate()
                .unwrap_err()
                .to_string()
                .contains("YYYY-MM-DD")
        );
    }

    #[test]
    fn worknote_rejects_blank_notes() {
        let mut form = WorknoteForm::new(TicketId::new(5));
        form.author_id = Some(UserId::new(1));
        form.note = "   ".to_string();
        assert!(form.validate().is_err());

        form.note = "replaced the panel".to_string();
        assert_eq!(form.validate().unwrap().ticket_id, TicketId::new(5));
    }

    #[test]
    fn relation_end_date_cannot_precede_start() {
        let mut form = EndRelationForm {
            relation_id: RelationId::new(2),
            start_date: date!(2026 - 03 - 10),
            end_date: "2026-03-01".to_string(),
        };
        assert!(form.validate().is_err());

        form.end_date = "2026-03-10".to_string();
        assert_eq!(form.validate().unwrap().1, date!(2026 - 03 - 10));
    }
}
