// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use fleetdesk_app::{
    DeviceKind, DeviceUpdate, Filter, FilterSet, InstallStatus, NewDevice, NewWorknote,
    TicketPayload, TicketStatus, UserId, UserPayload,
};
use fleetdesk_db::{ListQuery, Store, validate_db_path};
use fleetdesk_testkit::FleetFaker;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::date;

fn open_store() -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    Ok(store)
}

fn query_with(filters: &[(&str, &str)]) -> ListQuery {
    ListQuery {
        filters: filters
            .iter()
            .map(|(field, value)| Filter::new(*field, *value))
            .collect::<FilterSet>(),
        ..ListQuery::default()
    }
}

fn add_user(store: &Store, name: &str, email: &str) -> Result<UserId> {
    store.create_user(&UserPayload {
        name: name.to_owned(),
        email: email.to_owned(),
    })
}

fn add_device(store: &Store, serial: &str, model: &str) -> Result<fleetdesk_app::DeviceId> {
    store.create_device(&NewDevice {
        kind: DeviceKind::Computer,
        serial_number: serial.to_owned(),
        model: model.to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::InInventory,
        user_id: None,
    })
}

fn today() -> time::Date {
    OffsetDateTime::now_utc().date()
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("/tmp/fleetdesk.db").is_ok());
}

#[test]
fn bootstrap_is_idempotent_on_disk() -> Result<()> {
    let (_dir, path) = fleetdesk_testkit::temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        add_user(&store, "Ada", "ada@example.com")?;
    }
    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert!(store.list_users(&ListQuery::default())?.total == 1);
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = open_store()?;

    store.raw_connection().execute_batch(
        "
        ALTER TABLE devices RENAME TO devices_old;
        CREATE TABLE devices (
          id INTEGER PRIMARY KEY,
          device_type TEXT NOT NULL,
          model TEXT NOT NULL DEFAULT '',
          order_id TEXT NOT NULL DEFAULT '',
          install_status TEXT NOT NULL,
          user_id INTEGER,
          created_at TEXT NOT NULL
        );
        DROP TABLE devices_old;
        ",
    )?;

    let err = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = err.to_string();
    assert!(message.contains("table `devices` is missing required columns"));
    assert!(message.contains("serial_number"));
    Ok(())
}

#[test]
fn terms_or_within_a_field_and_fields_and_across() -> Result<()> {
    let store = open_store()?;
    add_device(&store, "SN-1", "HP EliteBook")?;
    add_device(&store, "SN-2", "Dell XPS")?;
    add_device(&store, "SN-3", "Apple MacBook")?;
    add_device(&store, "ZZ-4", "HP ZBook")?;

    let page = store.list_devices(DeviceKind::Computer, &query_with(&[("model", "HP,Dell")]))?;
    assert_eq!(page.total, 3);

    let page = store.list_devices(
        DeviceKind::Computer,
        &query_with(&[("model", "HP,Dell"), ("serial_number", "SN")]),
    )?;
    assert_eq!(page.total, 2);
    let serials: Vec<_> = page
        .rows
        .iter()
        .map(|device| device.serial_number.as_str())
        .collect();
    assert_eq!(serials, vec!["SN-1", "SN-2"]);
    Ok(())
}

#[test]
fn prefix_match_is_case_insensitive_and_anchored() -> Result<()> {
    let store = open_store()?;
    add_device(&store, "SN-1", "ThinkPad X1")?;
    add_device(&store, "SN-2", "Pad Mini")?;

    let page = store.list_devices(DeviceKind::Computer, &query_with(&[("model", "think")]))?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].model, "ThinkPad X1");

    // "Pad" occurs inside ThinkPad but prefix match must not find it there.
    let page = store.list_devices(DeviceKind::Computer, &query_with(&[("model", "Pad")]))?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].model, "Pad Mini");
    Ok(())
}

#[test]
fn pages_are_contiguous_and_non_overlapping() -> Result<()> {
    let store = open_store()?;
    for index in 0..45 {
        add_device(&store, &format!("SN-{index:03}"), "ThinkPad")?;
    }

    let mut seen = Vec::new();
    for page_number in 1..=3 {
        let page = store.list_devices(
            DeviceKind::Computer,
            &ListQuery {
                page: page_number,
                per_page: 20,
                ..ListQuery::default()
            },
        )?;
        assert_eq!(page.total, 45);
        assert!(page.rows.len() <= 20);
        seen.extend(page.rows.iter().map(|device| device.id));
    }
    assert_eq!(seen.len(), 45);
    let mut deduped = seen.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), 45, "pages overlapped");
    Ok(())
}

#[test]
fn out_of_range_page_is_empty_but_keeps_the_total() -> Result<()> {
    let store = open_store()?;
    add_device(&store, "SN-1", "ThinkPad")?;

    let page = store.list_devices(
        DeviceKind::Computer,
        &ListQuery {
            page: 9,
            per_page: 20,
            ..ListQuery::default()
        },
    )?;
    assert!(page.rows.is_empty());
    assert_eq!(page.total, 1);
    Ok(())
}

#[test]
fn device_kinds_do_not_bleed_between_lists() -> Result<()> {
    let store = open_store()?;
    add_device(&store, "CMP-1", "ThinkPad")?;
    store.create_device(&NewDevice {
        kind: DeviceKind::Monitor,
        serial_number: "MON-1".to_owned(),
        model: "Dell U2723QE".to_owned(),
        order_id: "ORD-2".to_owned(),
        install_status: InstallStatus::InInventory,
        user_id: None,
    })?;

    assert_eq!(
        store
            .list_devices(DeviceKind::Computer, &ListQuery::default())?
            .total,
        1
    );
    let monitors = store.list_devices(DeviceKind::Monitor, &ListQuery::default())?;
    assert_eq!(monitors.total, 1);
    assert_eq!(monitors.rows[0].kind, DeviceKind::Monitor);
    Ok(())
}

#[test]
fn enum_filter_resolves_by_containment() -> Result<()> {
    let store = open_store()?;
    add_device(&store, "SN-1", "ThinkPad")?;
    let user = add_user(&store, "Ada", "ada@example.com")?;
    store.create_device(&NewDevice {
        kind: DeviceKind::Computer,
        serial_number: "SN-2".to_owned(),
        model: "XPS".to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::Deployed,
        user_id: Some(user),
    })?;

    let page = store.list_devices(
        DeviceKind::Computer,
        &query_with(&[("install_status", "deploy")]),
    )?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].install_status, InstallStatus::Deployed);
    Ok(())
}

#[test]
fn unresolvable_enum_term_yields_an_empty_page_not_an_error() -> Result<()> {
    let store = open_store()?;
    add_device(&store, "SN-1", "ThinkPad")?;

    let page = store.list_devices(
        DeviceKind::Computer,
        &query_with(&[("install_status", "warp-drive")]),
    )?;
    assert!(page.rows.is_empty());
    assert_eq!(page.total, 0);
    Ok(())
}

#[test]
fn timestamp_filter_covers_one_calendar_day() -> Result<()> {
    let store = open_store()?;
    add_device(&store, "SN-1", "ThinkPad")?;
    store.raw_connection().execute(
        "UPDATE devices SET created_at = '2026-03-05T23:59:59Z' WHERE serial_number = 'SN-1'",
        [],
    )?;
    add_device(&store, "SN-2", "ThinkPad")?;
    store.raw_connection().execute(
        "UPDATE devices SET created_at = '2026-03-06T00:00:00Z' WHERE serial_number = 'SN-2'",
        [],
    )?;

    let page = store.list_devices(
        DeviceKind::Computer,
        &query_with(&[("created_at", "2026-03-05")]),
    )?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].serial_number, "SN-1");
    Ok(())
}

#[test]
fn null_term_matches_tickets_without_a_resolution_date() -> Result<()> {
    let store = open_store()?;
    let caller = add_user(&store, "Ada", "ada@example.com")?;
    store.create_ticket(&TicketPayload {
        title: "Open one".to_owned(),
        description: String::new(),
        status: TicketStatus::New,
        caller_id: caller,
        assigned_to: None,
        estimated_resolution_date: None,
        resolution_date: None,
    })?;
    store.create_ticket(&TicketPayload {
        title: "Closed one".to_owned(),
        description: String::new(),
        status: TicketStatus::Resolved,
        caller_id: caller,
        assigned_to: None,
        estimated_resolution_date: None,
        resolution_date: Some(date!(2026 - 03 - 05)),
    })?;

    let page = store.list_tickets(&query_with(&[("resolution_date", "null")]))?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].title, "Open one");

    let page = store.list_tickets(&query_with(&[("resolution_date", "2026-03-05")]))?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].title, "Closed one");
    Ok(())
}

#[test]
fn ticket_number_matches_exactly_for_digits_and_prefix_otherwise() -> Result<()> {
    let store = open_store()?;
    let caller = add_user(&store, "Ada", "ada@example.com")?;
    for title in ["First", "Second", "Third"] {
        store.create_ticket(&TicketPayload {
            title: title.to_owned(),
            description: String::new(),
            status: TicketStatus::New,
            caller_id: caller,
            assigned_to: None,
            estimated_resolution_date: None,
            resolution_date: None,
        })?;
    }

    // Numbers are 1, 2, 3; "1" must not prefix-match nothing else here,
    // but an exact match on 1 excludes the others by definition.
    let page = store.list_tickets(&query_with(&[("number", "1")]))?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].number, 1);
    Ok(())
}

#[test]
fn assigned_join_stays_left_until_that_field_is_filtered() -> Result<()> {
    let store = open_store()?;
    let caller = add_user(&store, "Ada", "ada@example.com")?;
    let agent = add_user(&store, "Grace", "grace@example.com")?;
    store.create_ticket(&TicketPayload {
        title: "Assigned".to_owned(),
        description: String::new(),
        status: TicketStatus::New,
        caller_id: caller,
        assigned_to: Some(agent),
        estimated_resolution_date: None,
        resolution_date: None,
    })?;
    store.create_ticket(&TicketPayload {
        title: "Unassigned".to_owned(),
        description: String::new(),
        status: TicketStatus::New,
        caller_id: caller,
        assigned_to: None,
        estimated_resolution_date: None,
        resolution_date: None,
    })?;

    // Null assignees survive the default projection.
    let page = store.list_tickets(&ListQuery::default())?;
    assert_eq!(page.total, 2);
    assert!(page.rows.iter().any(|ticket| ticket.assigned_to.is_none()));

    // Filtering the joined field tightens the join.
    let page = store.list_tickets(&query_with(&[("assigned_to.email", "grace")]))?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].title, "Assigned");
    Ok(())
}

#[test]
fn tickets_are_ordered_by_title_ascending() -> Result<()> {
    let store = open_store()?;
    let caller = add_user(&store, "Ada", "ada@example.com")?;
    for title in ["Zebra", "Alpha", "Mango"] {
        store.create_ticket(&TicketPayload {
            title: title.to_owned(),
            description: String::new(),
            status: TicketStatus::New,
            caller_id: caller,
            assigned_to: None,
            estimated_resolution_date: None,
            resolution_date: None,
        })?;
    }

    let page = store.list_tickets(&ListQuery::default())?;
    let titles: Vec<_> = page.rows.iter().map(|ticket| ticket.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "Mango", "Zebra"]);
    Ok(())
}

#[test]
fn duplicate_serial_number_is_reported_as_already_exists() -> Result<()> {
    let store = open_store()?;
    add_device(&store, "SN-1", "ThinkPad")?;

    let err = add_device(&store, "SN-1", "XPS").expect_err("duplicate serial should fail");
    assert!(err.to_string().contains("already exists"));
    Ok(())
}

#[test]
fn duplicate_email_is_reported_as_already_exists() -> Result<()> {
    let store = open_store()?;
    add_user(&store, "Ada", "ada@example.com")?;

    let err =
        add_user(&store, "Other Ada", "ada@example.com").expect_err("duplicate email should fail");
    assert!(err.to_string().contains("already exists"));

    let grace = add_user(&store, "Grace", "grace@example.com")?;
    let err = store
        .update_user(
            grace,
            &UserPayload {
                name: "Grace".to_owned(),
                email: "ada@example.com".to_owned(),
            },
        )
        .expect_err("update into duplicate email should fail");
    assert!(err.to_string().contains("already exists"));
    Ok(())
}

#[test]
fn deployed_device_requires_a_user_at_the_store_too() -> Result<()> {
    let store = open_store()?;
    let err = store
        .create_device(&NewDevice {
            kind: DeviceKind::Computer,
            serial_number: "SN-1".to_owned(),
            model: "ThinkPad".to_owned(),
            order_id: "ORD-1".to_owned(),
            install_status: InstallStatus::Deployed,
            user_id: None,
        })
        .expect_err("deployed without user should fail");
    assert!(err.to_string().contains("assigned user"));
    Ok(())
}

#[test]
fn reassignment_ends_the_previous_relation_in_one_step() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    let grace = add_user(&store, "Grace", "grace@example.com")?;
    let device = store.create_device(&NewDevice {
        kind: DeviceKind::Computer,
        serial_number: "SN-1".to_owned(),
        model: "ThinkPad".to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::Deployed,
        user_id: Some(ada),
    })?;

    store.update_device(
        device,
        &DeviceUpdate {
            model: "ThinkPad".to_owned(),
            order_id: "ORD-1".to_owned(),
            install_status: InstallStatus::Deployed,
            user_id: Some(grace),
        },
    )?;

    let history = store.device_history(device)?;
    assert_eq!(history.len(), 2);
    let active: Vec<_> = history
        .iter()
        .filter(|relation| relation.end_date.is_none())
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].user.id, grace);
    Ok(())
}

#[test]
fn moving_off_deployed_clears_user_and_ends_the_relation() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    let device = store.create_device(&NewDevice {
        kind: DeviceKind::Computer,
        serial_number: "SN-1".to_owned(),
        model: "ThinkPad".to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::Deployed,
        user_id: Some(ada),
    })?;

    store.update_device(
        device,
        &DeviceUpdate {
            model: "ThinkPad".to_owned(),
            order_id: "ORD-1".to_owned(),
            install_status: InstallStatus::InInventory,
            user_id: None,
        },
    )?;

    let loaded = store.get_device(device)?.expect("device exists");
    assert_eq!(loaded.install_status, InstallStatus::InInventory);
    assert_eq!(loaded.user_id, None);
    let history = store.device_history(device)?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].end_date, Some(today()));
    Ok(())
}

#[test]
fn end_relation_validates_the_date_order_and_clears_the_device() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    let device = store.create_device(&NewDevice {
        kind: DeviceKind::Computer,
        serial_number: "SN-1".to_owned(),
        model: "ThinkPad".to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::Deployed,
        user_id: Some(ada),
    })?;

    let history = store.device_history(device)?;
    let relation = history[0].id;

    let err = store
        .end_relation(relation, date!(2000 - 01 - 01))
        .expect_err("end before start should fail");
    assert!(err.to_string().contains("start date"));

    let end = today();
    store.end_relation(relation, end)?;
    assert_eq!(store.get_device(device)?.expect("device").user_id, None);

    let err = store
        .end_relation(relation, end)
        .expect_err("relation already ended");
    assert!(err.to_string().contains("already ended"));
    Ok(())
}

#[test]
fn worknotes_are_append_only_and_newest_first() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    let ticket = store.create_ticket(&TicketPayload {
        title: "Broken dock".to_owned(),
        description: String::new(),
        status: TicketStatus::New,
        caller_id: ada,
        assigned_to: None,
        estimated_resolution_date: None,
        resolution_date: None,
    })?;

    store.add_worknote(&NewWorknote {
        ticket_id: ticket,
        author_id: ada,
        note: "first".to_owned(),
    })?;
    store.add_worknote(&NewWorknote {
        ticket_id: ticket,
        author_id: ada,
        note: "second".to_owned(),
    })?;

    let notes = store.list_worknotes(ticket)?;
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].note, "second");
    assert_eq!(notes[1].note, "first");
    assert_eq!(
        notes[0].author.as_ref().map(|author| author.email.as_str()),
        Some("ada@example.com")
    );
    Ok(())
}

#[test]
fn ticket_numbers_ascend_from_the_current_maximum() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    let mut numbers = Vec::new();
    for index in 0..3 {
        let id = store.create_ticket(&TicketPayload {
            title: format!("Ticket {index}"),
            description: String::new(),
            status: TicketStatus::New,
            caller_id: ada,
            assigned_to: None,
            estimated_resolution_date: None,
            resolution_date: None,
        })?;
        numbers.push(store.get_ticket(id)?.expect("ticket").number);
    }
    assert_eq!(numbers, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn deleting_a_referenced_user_is_refused() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    store.create_device(&NewDevice {
        kind: DeviceKind::Computer,
        serial_number: "SN-1".to_owned(),
        model: "ThinkPad".to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::Deployed,
        user_id: Some(ada),
    })?;

    let err = store.delete_user(ada).expect_err("referenced user");
    assert!(err.to_string().contains("reassign or remove"));

    let lonely = add_user(&store, "Lonely", "lonely@example.com")?;
    store.delete_user(lonely)?;
    assert!(store.get_user(lonely)?.is_none());
    Ok(())
}

#[test]
fn dashboard_counts_track_the_interesting_rows() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    store.create_device(&NewDevice {
        kind: DeviceKind::Computer,
        serial_number: "SN-1".to_owned(),
        model: "ThinkPad".to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::Deployed,
        user_id: Some(ada),
    })?;
    add_device(&store, "SN-2", "XPS")?;
    store.create_ticket(&TicketPayload {
        title: "Open".to_owned(),
        description: String::new(),
        status: TicketStatus::OnHold,
        caller_id: ada,
        assigned_to: None,
        estimated_resolution_date: None,
        resolution_date: None,
    })?;
    store.create_ticket(&TicketPayload {
        title: "Done".to_owned(),
        description: String::new(),
        status: TicketStatus::Resolved,
        caller_id: ada,
        assigned_to: None,
        estimated_resolution_date: None,
        resolution_date: None,
    })?;

    let counts = store.dashboard_counts()?;
    assert_eq!(counts.deployed_devices, 1);
    assert_eq!(counts.open_tickets, 1);
    assert_eq!(counts.active_relations, 1);
    Ok(())
}

#[test]
fn user_detail_lists_devices_and_tickets() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    let grace = add_user(&store, "Grace", "grace@example.com")?;
    store.create_device(&NewDevice {
        kind: DeviceKind::Computer,
        serial_number: "SN-1".to_owned(),
        model: "ThinkPad".to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::Deployed,
        user_id: Some(ada),
    })?;
    store.create_ticket(&TicketPayload {
        title: "Called in".to_owned(),
        description: String::new(),
        status: TicketStatus::New,
        caller_id: ada,
        assigned_to: None,
        estimated_resolution_date: None,
        resolution_date: None,
    })?;
    store.create_ticket(&TicketPayload {
        title: "Working on".to_owned(),
        description: String::new(),
        status: TicketStatus::InProgress,
        caller_id: grace,
        assigned_to: Some(ada),
        estimated_resolution_date: None,
        resolution_date: None,
    })?;

    assert_eq!(store.user_devices(ada)?.len(), 1);
    assert_eq!(store.user_tickets(ada)?.len(), 2);
    assert_eq!(store.user_tickets(grace)?.len(), 1);
    Ok(())
}

#[test]
fn faker_generated_batch_survives_the_unique_indexes() -> Result<()> {
    let store = open_store()?;
    let mut faker = FleetFaker::new(7);

    let mut users = Vec::new();
    for _ in 0..10 {
        let user = faker.user();
        users.push(store.create_user(&UserPayload {
            name: user.name,
            email: user.email,
        })?);
    }
    for index in 0..30 {
        let kind = if index % 3 == 0 {
            DeviceKind::Monitor
        } else {
            DeviceKind::Computer
        };
        let device = faker.device(kind);
        let user_id = (device.install_status == InstallStatus::Deployed)
            .then(|| users[faker.int_n(users.len())]);
        store.create_device(&NewDevice {
            kind: device.kind,
            serial_number: device.serial_number,
            model: device.model,
            order_id: device.order_id,
            install_status: device.install_status,
            user_id,
        })?;
    }

    let computers = store.list_devices(DeviceKind::Computer, &ListQuery::default())?;
    let monitors = store.list_devices(DeviceKind::Monitor, &ListQuery::default())?;
    assert_eq!(computers.total + monitors.total, 30);
    Ok(())
}

#[test]
fn seed_demo_data_populates_every_list() -> Result<()> {
    let store = open_store()?;
    store.seed_demo_data()?;

    assert!(store.list_users(&ListQuery::default())?.total > 0);
    assert!(
        store
            .list_devices(DeviceKind::Computer, &ListQuery::default())?
            .total
            > 0
    );
    assert!(
        store
            .list_devices(DeviceKind::Monitor, &ListQuery::default())?
            .total
            > 0
    );
    assert!(store.list_tickets(&ListQuery::default())?.total > 0);
    assert!(store.list_relations(&ListQuery::default())?.total > 0);
    assert!(store.dashboard_counts()?.deployed_devices > 0);
    Ok(())
}

#[test]
fn relations_list_joins_device_and_user_projections() -> Result<()> {
    let store = open_store()?;
    let ada = add_user(&store, "Ada", "ada@example.com")?;
    store.create_device(&NewDevice {
        kind: DeviceKind::Monitor,
        serial_number: "MON-1".to_owned(),
        model: "Dell U2723QE".to_owned(),
        order_id: "ORD-1".to_owned(),
        install_status: InstallStatus::Deployed,
        user_id: Some(ada),
    })?;

    let page = store.list_relations(&query_with(&[("user.email", "ada")]))?;
    assert_eq!(page.total, 1);
    let relation = &page.rows[0];
    assert_eq!(relation.device.serial_number, "MON-1");
    assert_eq!(relation.device.kind, DeviceKind::Monitor);
    assert_eq!(relation.user.email, "ada@example.com");
    assert!(relation.end_date.is_none());

    let page = store.list_relations(&query_with(&[("end_date", "null")]))?;
    assert_eq!(page.total, 1);
    Ok(())
}

#[test]
fn list_users_orders_by_name_and_filters_by_email_prefix() -> Result<()> {
    let store = open_store()?;
    add_user(&store, "Zo Last", "zo@example.com")?;
    add_user(&store, "Ada First", "ada@example.com")?;

    let page = store.list_users(&ListQuery::default())?;
    assert_eq!(page.rows[0].name, "Ada First");

    let page = store.list_users(&query_with(&[("email", "zo")]))?;
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].name, "Zo Last");
    Ok(())
}

#[test]
fn stored_timestamps_are_utc_rfc3339() -> Result<()> {
    let store = open_store()?;
    add_user(&store, "Ada", "ada@example.com")?;
    let raw: String = store.raw_connection().query_row(
        "SELECT created_at FROM users LIMIT 1",
        [],
        |row| row.get(0),
    )?;
    assert!(OffsetDateTime::parse(&raw, &Rfc3339).is_ok());
    assert!(raw.ends_with('Z'));
    Ok(())
}
