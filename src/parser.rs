use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::{Result, SchedulerError};
use crate::schedule::date_utils::{parse_date, parse_weekday};
use crate::schedule::types::{
    ActivityType, AssignmentRecord, Blackout, Person, PersonId, Qualification,
};
use crate::schedule::{RoleCatalog, Roster};

/// Finds the first header matching `pred`
fn column<F>(headers: &StringRecord, pred: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    headers
        .iter()
        .position(|h| pred(h.trim().to_lowercase().as_str()))
}

fn cell(record: &StringRecord, col: Option<usize>) -> &str {
    col.and_then(|c| record.get(c)).unwrap_or("").trim()
}

/// Splits a multi-value cell on ';' or '|'
fn items(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c| c == ';' || c == '|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parses a boolean value, falling back to `default` when empty
fn parse_bool(value: &str, default: bool) -> bool {
    let lower = value.trim().to_lowercase();
    if lower.is_empty() {
        return default;
    }
    lower == "yes" || lower == "true" || lower == "1" || lower == "y"
}

/// "Preacher@2021-05-01" or just "Preacher"
fn parse_qualification(value: &str) -> Result<Qualification> {
    match value.split_once('@') {
        Some((role, since)) => Ok(Qualification {
            role: role.trim().to_string(),
            qualified_since: parse_date(since)?,
        }),
        None => Ok(Qualification {
            role: value.to_string(),
            qualified_since: NaiveDate::MIN,
        }),
    }
}

/// Empty means 0; anything else must be a whole number
fn parse_priority(value: &str) -> Result<i32> {
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|_| SchedulerError::config(format!("invalid priority {value:?}")))
}

/// "2024-03-01..2024-03-10" or a single date
fn parse_blackout(value: &str) -> Result<Blackout> {
    let (start, end) = match value.split_once("..") {
        Some((start, end)) => (parse_date(start)?, parse_date(end)?),
        None => {
            let date = parse_date(value)?;
            (date, date)
        }
    };
    if end < start {
        return Err(SchedulerError::config(format!(
            "blackout {value:?} ends before it starts"
        )));
    }
    Ok(Blackout { start, end })
}

fn parse_person(record: &StringRecord, cols: &RosterColumns, row: usize) -> Result<Option<Person>> {
    let id_str = cell(record, Some(cols.id));
    let name = cell(record, Some(cols.name));
    if id_str.is_empty() || name.is_empty() {
        return Ok(None);
    }
    let Ok(id) = id_str.parse::<PersonId>() else {
        tracing::warn!(row, id = id_str, "Skipping roster row with non-numeric id");
        return Ok(None);
    };

    let with_row = |err: SchedulerError| SchedulerError::config(format!("roster row {row}: {err}"));

    let mut person = Person::new(id, name);
    person.qualifications = items(cell(record, cols.roles))
        .map(parse_qualification)
        .collect::<Result<_>>()
        .map_err(with_row)?;
    person.priority = parse_priority(cell(record, cols.priority)).map_err(with_row)?;
    person.blackouts = items(cell(record, cols.blackouts))
        .map(parse_blackout)
        .collect::<Result<_>>()
        .map_err(with_row)?;
    person.weekly_exclusions = items(cell(record, cols.weekly))
        .map(|w| {
            parse_weekday(w).ok_or_else(|| with_row(SchedulerError::config(format!("invalid weekday {w:?}"))))
        })
        .collect::<Result<_>>()?;
    person.active = parse_bool(cell(record, cols.active), true);
    person.group_eligible = parse_bool(cell(record, cols.group), true);
    Ok(Some(person))
}

struct RosterColumns {
    id: usize,
    name: usize,
    roles: Option<usize>,
    priority: Option<usize>,
    blackouts: Option<usize>,
    weekly: Option<usize>,
    active: Option<usize>,
    group: Option<usize>,
}

impl RosterColumns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let id = column(headers, |h| h == "id" || h.contains("person id") || h.contains("member id"))
            .ok_or_else(|| SchedulerError::config("roster has no id column"))?;
        let name = column(headers, |h| h.contains("name"))
            .ok_or_else(|| SchedulerError::config("roster has no name column"))?;
        Ok(Self {
            id,
            name,
            roles: column(headers, |h| h.contains("role") || h.contains("qualif")),
            priority: column(headers, |h| h.contains("priority")),
            blackouts: column(headers, |h| h.contains("blackout") || h.contains("unavailable")),
            weekly: column(headers, |h| h.contains("weekly") || h.contains("exclu")),
            active: column(headers, |h| h == "active" || h.starts_with("active")),
            group: column(headers, |h| h.contains("group")),
        })
    }
}

/// Reads a roster CSV. A repeated id replaces the earlier row.
pub fn read_roster<R: Read>(reader: R) -> Result<Roster> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let cols = RosterColumns::locate(reader.headers()?)?;

    let mut people: HashMap<PersonId, Person> = HashMap::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // Header is line 1
        if let Some(person) = parse_person(&record, &cols, i + 2)? {
            people.insert(person.id, person);
        }
    }

    let roster = Roster::new(people.into_values().collect())?;
    tracing::info!(people = roster.len(), "Loaded roster");
    Ok(roster)
}

pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Roster> {
    read_roster(File::open(path)?)
}

/// Reads the activity catalog from a JSON array of activity types
pub fn read_catalog<R: Read>(reader: R) -> Result<RoleCatalog> {
    let activities: Vec<ActivityType> = serde_json::from_reader(reader)?;
    let catalog = RoleCatalog::new(activities)?;
    tracing::info!(activities = catalog.activities().count(), "Loaded role catalog");
    Ok(catalog)
}

pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<RoleCatalog> {
    read_catalog(File::open(path)?)
}

/// Reads past assignments (person id, role, activity, date) for seeding the ledger
pub fn read_history<R: Read>(reader: R) -> Result<Vec<AssignmentRecord>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let person_col = column(&headers, |h| h.contains("person") || h == "id")
        .unwrap_or(0);
    let role_col = column(&headers, |h| h.contains("role")).unwrap_or(1);
    let activity_col = column(&headers, |h| h.contains("activity")).unwrap_or(2);
    let date_col = column(&headers, |h| h.contains("date")).unwrap_or(3);

    let now = Utc::now();
    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let person = cell(&record, Some(person_col));
        let role = cell(&record, Some(role_col));
        let date = cell(&record, Some(date_col));
        let (Ok(person_id), Ok(date)) = (person.parse::<PersonId>(), parse_date(date)) else {
            tracing::warn!(row = i + 2, "Skipping malformed history row");
            continue;
        };
        if role.is_empty() {
            tracing::warn!(row = i + 2, "Skipping history row without a role");
            continue;
        }
        records.push(AssignmentRecord {
            person_id,
            role: role.to_string(),
            activity_type_id: cell(&record, Some(activity_col)).to_string(),
            date,
            program_id: None,
            created_at: now,
        });
    }
    tracing::info!(records = records.len(), "Loaded assignment history");
    Ok(records)
}

pub fn load_history<P: AsRef<Path>>(path: P) -> Result<Vec<AssignmentRecord>> {
    read_history(File::open(path)?)
}
