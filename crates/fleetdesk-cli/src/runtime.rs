// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use fleetdesk_app::{DashboardCounts, DeviceId, DeviceKind, ListKind, ListParams, TicketId, UserId, UserRef};
use fleetdesk_db::{ListQuery, Store};
use fleetdesk_tui::{
    AppRuntime, DeviceDetail, FormSubmission, ListRows, ListSnapshot, TicketDetail, UserDetail,
};

pub struct DbRuntime<'a> {
    store: &'a Store,
    per_page: u64,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store, per_page: u64) -> Self {
        Self { store, per_page }
    }

    fn query_for(&self, params: &ListParams) -> ListQuery {
        ListQuery {
            page: params.page,
            per_page: self.per_page,
            filters: params.filters.clone(),
        }
    }

    fn user_ref(&self, user_id: UserId) -> Result<Option<UserRef>> {
        Ok(self.store.get_user(user_id)?.map(|user| UserRef {
            id: user.id,
            email: user.email,
        }))
    }
}

impl AppRuntime for DbRuntime<'_> {
    fn page_size(&self) -> u64 {
        self.per_page
    }

    fn load_dashboard_counts(&mut self) -> Result<DashboardCounts> {
        self.store.dashboard_counts()
    }

    fn load_list(&mut self, kind: ListKind, params: &ListParams) -> Result<ListSnapshot> {
        let query = self.query_for(params);
        let snapshot = match kind {
            ListKind::Computers => {
                let page = self.store.list_devices(DeviceKind::Computer, &query)?;
                ListSnapshot {
                    rows: ListRows::Computers(page.rows),
                    total: page.total,
                }
            }
            ListKind::Monitors => {
                let page = self.store.list_devices(DeviceKind::Monitor, &query)?;
                ListSnapshot {
                    rows: ListRows::Monitors(page.rows),
                    total: page.total,
                }
            }
            ListKind::Users => {
                let page = self.store.list_users(&query)?;
                ListSnapshot {
                    rows: ListRows::Users(page.rows),
                    total: page.total,
                }
            }
            ListKind::Tickets => {
                let page = self.store.list_tickets(&query)?;
                ListSnapshot {
                    rows: ListRows::Tickets(page.rows),
                    total: page.total,
                }
            }
            ListKind::Relations => {
                let page = self.store.list_relations(&query)?;
                ListSnapshot {
                    rows: ListRows::Relations(page.rows),
                    total: page.total,
                }
            }
        };
        Ok(snapshot)
    }

    fn load_device_detail(&mut self, id: DeviceId) -> Result<Option<DeviceDetail>> {
        let Some(device) = self.store.get_device(id)? else {
            return Ok(None);
        };
        let history = self.store.device_history(id)?;
        Ok(Some(DeviceDetail { device, history }))
    }

    fn load_ticket_detail(&mut self, id: TicketId) -> Result<Option<TicketDetail>> {
        let Some(ticket) = self.store.get_ticket(id)? else {
            return Ok(None);
        };
        let caller = self.user_ref(ticket.caller_id)?;
        let assigned_to = match ticket.assigned_to {
            Some(user_id) => self.user_ref(user_id)?,
            None => None,
        };
        let worknotes = self.store.list_worknotes(id)?;
        Ok(Some(TicketDetail {
            ticket,
            caller,
            assigned_to,
            worknotes,
        }))
    }

    fn load_user_detail(&mut self, id: UserId) -> Result<Option<UserDetail>> {
        let Some(user) = self.store.get_user(id)? else {
            return Ok(None);
        };
        let devices = self.store.user_devices(id)?;
        let tickets = self.store.user_tickets(id)?;
        Ok(Some(UserDetail {
            user,
            devices,
            tickets,
        }))
    }

    fn list_user_options(&mut self) -> Result<Vec<(UserId, String)>> {
        Ok(self
            .store
            .list_user_options()?
            .into_iter()
            .map(|option| (option.id, option.name))
            .collect())
    }

    fn submit(&mut self, submission: &FormSubmission) -> Result<()> {
        match submission {
            FormSubmission::CreateDevice(device) => self.store.create_device(device).map(|_| ()),
            FormSubmission::UpdateDevice(id, update) => self.store.update_device(*id, update),
            FormSubmission::DeleteDevice(id) => self.store.delete_device(*id),
            FormSubmission::CreateUser(user) => self.store.create_user(user).map(|_| ()),
            FormSubmission::UpdateUser(id, update) => self.store.update_user(*id, update),
            FormSubmission::DeleteUser(id) => self.store.delete_user(*id),
            FormSubmission::CreateTicket(ticket) => self.store.create_ticket(ticket).map(|_| ()),
            FormSubmission::UpdateTicket(id, update) => self.store.update_ticket(*id, update),
            FormSubmission::DeleteTicket(id) => self.store.delete_ticket(*id),
            FormSubmission::AddWorknote(worknote) => self.store.add_worknote(worknote).map(|_| ()),
            FormSubmission::EndRelation(id, end_date) => self.store.end_relation(*id, *end_date),
        }
    }
}
