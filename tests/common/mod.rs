#![allow(dead_code)]

use chrono::{NaiveDate, Utc};

use service_rota::config::SchedulerConfig;
use service_rota::schedule::{
    ActivityType, AssignmentLedger, AssignmentRecord, Person, PersonId, Qualification,
    RoleCatalog, RoleRequirement, Roster,
};
use service_rota::service::SchedulingService;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn person(id: PersonId, roles: &[&str], priority: i32) -> Person {
    let mut p = Person::new(id, format!("Member {id}"));
    p.priority = priority;
    p.qualifications = roles
        .iter()
        .map(|role| Qualification {
            role: role.to_string(),
            qualified_since: d(2020, 1, 1),
        })
        .collect();
    p
}

fn activity(id: &str, name: &str, roles: &[(&str, u32)]) -> ActivityType {
    ActivityType {
        id: id.to_string(),
        name: name.to_string(),
        version: 1,
        roles: roles
            .iter()
            .enumerate()
            .map(|(i, (role, count))| RoleRequirement {
                role: role.to_string(),
                count: *count,
                display_order: i as u32 + 1,
            })
            .collect(),
    }
}

/// Sunday Service = [Preacher, Worship Leader, Usher]; Midweek = [Preacher, Usher x2]
pub fn catalog() -> RoleCatalog {
    RoleCatalog::new(vec![
        activity(
            "sunday-service",
            "Sunday Service",
            &[("Preacher", 1), ("Worship Leader", 1), ("Usher", 1)],
        ),
        activity("midweek", "Midweek Service", &[("Preacher", 1), ("Usher", 2)]),
    ])
    .unwrap()
}

/// Four preachers, three worship leaders, five ushers; 4 and 7 also usher
pub fn congregation() -> Roster {
    Roster::new(vec![
        person(1, &["Preacher"], 0),
        person(2, &["Preacher"], 0),
        person(3, &["Preacher"], 0),
        person(4, &["Preacher", "Usher"], 0),
        person(5, &["Worship Leader"], 0),
        person(6, &["Worship Leader"], 0),
        person(7, &["Worship Leader", "Usher"], 0),
        person(8, &["Usher"], 0),
        person(9, &["Usher"], 0),
        person(10, &["Usher"], 0),
        person(11, &["Usher"], 0),
        person(12, &["Usher"], 0),
    ])
    .unwrap()
}

pub fn served(ledger: &mut AssignmentLedger, person_id: PersonId, role: &str, date: NaiveDate) {
    ledger.record_served(AssignmentRecord {
        person_id,
        role: role.to_string(),
        activity_type_id: "sunday-service".to_string(),
        date,
        program_id: None,
        created_at: Utc::now(),
    });
}

pub fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        worker_count: 2,
        snapshot_timeout_ms: 100,
        lock_timeout_ms: 100,
        ..SchedulerConfig::default()
    }
}

pub fn service_with(roster: Roster, ledger: AssignmentLedger) -> SchedulingService {
    SchedulingService::new(test_config(), roster, catalog(), ledger)
}

pub fn service() -> SchedulingService {
    service_with(congregation(), AssignmentLedger::new())
}
