// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Deterministic fake data for tests and demo seeding. Same seed, same
//! sequence of values.

use anyhow::{Context, Result};
use fleetdesk_app::{DeviceKind, InstallStatus, TicketStatus};
use std::path::PathBuf;
use time::{Date, Duration, Month, OffsetDateTime, Time};

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];
const EMAIL_DOMAINS: [&str; 4] = [
    "corp.example.com",
    "fleetdesk.test",
    "office.example.org",
    "it.example.net",
];

const COMPUTER_MODELS: [&str; 10] = [
    "ThinkPad X1 Carbon",
    "ThinkPad T14",
    "MacBook Pro 14",
    "MacBook Air 13",
    "Dell XPS 13",
    "Dell Latitude 7440",
    "HP EliteBook 840",
    "HP ZBook Studio",
    "Surface Laptop 6",
    "Framework 13",
];
const MONITOR_MODELS: [&str; 8] = [
    "Dell U2723QE",
    "Dell P2422H",
    "LG 27UP850",
    "LG 34WN780",
    "HP Z27",
    "Samsung S80A",
    "BenQ PD2705U",
    "ASUS ProArt PA278",
];

const TICKET_TITLES: [&str; 12] = [
    "Laptop will not boot",
    "Monitor flickers intermittently",
    "Docking station not detected",
    "Keyboard keys unresponsive",
    "VPN client fails to connect",
    "Battery drains overnight",
    "External display stays black",
    "Fan noise under light load",
    "Webcam not recognized",
    "Storage almost full",
    "Screen has dead pixels",
    "Charger overheating",
];

const WORKNOTE_TEXTS: [&str; 8] = [
    "Reproduced the issue on site.",
    "Ordered a replacement part.",
    "Firmware updated, asking the user to retest.",
    "Swapped the cable, monitoring.",
    "Escalated to the vendor.",
    "User confirmed the fix.",
    "Scheduled a desk visit.",
    "Collected logs for analysis.",
];

const INSTALL_STATUSES: [InstallStatus; 4] = [
    InstallStatus::Deployed,
    InstallStatus::InInventory,
    InstallStatus::EndOfLife,
    InstallStatus::Disposed,
];
const TICKET_STATUSES: [TicketStatus; 5] = [
    TicketStatus::New,
    TicketStatus::InProgress,
    TicketStatus::OnHold,
    TicketStatus::Resolved,
    TicketStatus::Cancelled,
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeUser {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeDevice {
    pub kind: DeviceKind,
    pub serial_number: String,
    pub model: String,
    pub order_id: String,
    pub install_status: InstallStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTicket {
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub estimated_resolution_date: Option<Date>,
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

#[derive(Debug, Clone)]
pub struct FleetFaker {
    rng: DeterministicRng,
    serial_counter: u32,
    email_counter: u32,
}

impl FleetFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            serial_counter: 0,
            email_counter: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// Emails carry a running counter so a batch never collides with the
    /// unique index.
    pub fn user(&mut self) -> FakeUser {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let domain = self.pick(&EMAIL_DOMAINS);
        self.email_counter += 1;
        FakeUser {
            name: format!("{first} {last}"),
            email: format!(
                "{}.{}{}@{domain}",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase(),
                self.email_counter,
            ),
        }
    }

    pub fn device(&mut self, kind: DeviceKind) -> FakeDevice {
        let model = match kind {
            DeviceKind::Computer => self.pick(&COMPUTER_MODELS),
            DeviceKind::Monitor => self.pick(&MONITOR_MODELS),
        };
        self.serial_counter += 1;
        let prefix = match kind {
            DeviceKind::Computer => "CMP",
            DeviceKind::Monitor => "MON",
        };
        let suffix = self.int_range(100, 999);
        FakeDevice {
            kind,
            serial_number: format!("{prefix}-{:04}-{}", self.serial_counter, suffix),
            model: model.to_owned(),
            order_id: format!("ORD-{:04}", self.int_range(1, 9_999)),
            install_status: INSTALL_STATUSES[self.rng.int_n(INSTALL_STATUSES.len())],
        }
    }

    pub fn ticket(&mut self) -> FakeTicket {
        let status = TICKET_STATUSES[self.rng.int_n(TICKET_STATUSES.len())];
        let mut ticket = FakeTicket {
            title: self.pick(&TICKET_TITLES).to_owned(),
            description: self.sentence(6, 16),
            status,
            estimated_resolution_date: None,
        };
        if self.rng.bool() {
            ticket.estimated_resolution_date = Some(self.date_in_year(REFERENCE_YEAR));
        }
        ticket
    }

    pub fn worknote(&mut self) -> String {
        self.pick(&WORKNOTE_TEXTS).to_owned()
    }

    pub fn date_in_year(&mut self, year: i32) -> Date {
        let start = midnight_utc(year, Month::January, 1);
        let end = midnight_utc(year, Month::December, 31);
        self.random_datetime_between(start, end).date()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn random_datetime_between(
        &mut self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> OffsetDateTime {
        let start_ts = start.unix_timestamp();
        let end_ts = end.unix_timestamp();
        if end_ts <= start_ts {
            return start;
        }
        let span = (end_ts - start_ts) as u64;
        let offset = self.rng.next_u64() % (span + 1);
        OffsetDateTime::from_unix_timestamp(start_ts + offset as i64).expect("valid unix timestamp")
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        const WORDS: [&str; 24] = [
            "laptop", "monitor", "dock", "cable", "battery", "charger", "firmware", "driver",
            "replace", "inspect", "update", "restart", "escalate", "collect", "verify", "retest",
            "screen", "keyboard", "network", "storage", "desk", "office", "vendor", "warranty",
        ];

        let count = self.int_range(min_words as i64, max_words as i64) as usize;
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.pick(&WORDS).to_owned());
        }
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("fleetdesk.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

fn midnight_utc(year: i32, month: Month, day: u8) -> OffsetDateTime {
    let date = Date::from_calendar_date(year, month, day).expect("valid calendar date");
    let midnight = Time::from_hms(0, 0, 0).expect("valid midnight");
    date.with_time(midnight).assume_utc()
}
