use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::types::{AssignmentRecord, PersonId, Program};

/// Read access to "when did X last serve as Y"
pub trait ServiceHistory {
    fn last_served(&self, person_id: PersonId, role: &str) -> Option<NaiveDate>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEntry {
    Served(AssignmentRecord),
    /// Cancels an earlier `Served` entry with the same person, role and date
    Tombstone(AssignmentRecord),
    GroupTurn {
        group_id: u32,
        date: NaiveDate,
        turn: u64,
        recorded_at: DateTime<Utc>,
    },
}

/// Derived query index: served dates per (person, role) and latest (date, turn) per group
#[derive(Debug, Clone, Default)]
struct ServedIndex {
    served: HashMap<PersonId, HashMap<String, BTreeMap<NaiveDate, u32>>>,
    group_turns: HashMap<u32, (NaiveDate, u64)>,
}

impl ServedIndex {
    fn add(&mut self, record: &AssignmentRecord) {
        *self
            .served
            .entry(record.person_id)
            .or_default()
            .entry(record.role.clone())
            .or_default()
            .entry(record.date)
            .or_insert(0) += 1;
    }

    fn remove(&mut self, record: &AssignmentRecord) -> bool {
        let Some(roles) = self.served.get_mut(&record.person_id) else {
            return false;
        };
        let Some(dates) = roles.get_mut(&record.role) else {
            return false;
        };
        let Some(count) = dates.get_mut(&record.date) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            dates.remove(&record.date);
        }
        if dates.is_empty() {
            roles.remove(&record.role);
        }
        true
    }

    fn dates(&self, person_id: PersonId, role: &str) -> Option<&BTreeMap<NaiveDate, u32>> {
        self.served.get(&person_id).and_then(|roles| roles.get(role))
    }

    fn last_served(&self, person_id: PersonId, role: &str) -> Option<NaiveDate> {
        self.dates(person_id, role)
            .and_then(|dates| dates.keys().next_back().copied())
    }

    fn service_count(&self, person_id: PersonId, role: &str) -> u32 {
        self.dates(person_id, role)
            .map(|dates| dates.values().sum())
            .unwrap_or(0)
    }
}

/// Append-only history of committed assignments and group turns
#[derive(Debug, Default)]
pub struct AssignmentLedger {
    entries: Vec<LedgerEntry>,
    index: ServedIndex,
}

impl AssignmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `Served` entry per filled assignment. Returns the number appended.
    pub fn record_commit(&mut self, program: &Program) -> usize {
        let now = Utc::now();
        let mut appended = 0;
        for assignment in &program.assignments {
            if let Some(person_id) = assignment.person_id {
                self.record_served(AssignmentRecord {
                    person_id,
                    role: assignment.role.clone(),
                    activity_type_id: program.activity_type_id.clone(),
                    date: program.date,
                    program_id: Some(program.id),
                    created_at: now,
                });
                appended += 1;
            }
        }
        tracing::debug!(
            program_id = %program.id,
            activity_type_id = %program.activity_type_id,
            date = %program.date,
            appended,
            "Recorded committed program"
        );
        appended
    }

    pub fn record_served(&mut self, record: AssignmentRecord) {
        self.index.add(&record);
        self.entries.push(LedgerEntry::Served(record));
    }

    /// Appends compensating tombstones for every assignment of a cancelled program
    pub fn record_cancellation(&mut self, program: &Program) -> usize {
        let now = Utc::now();
        let mut appended = 0;
        for assignment in &program.assignments {
            let Some(person_id) = assignment.person_id else {
                continue;
            };
            let record = AssignmentRecord {
                person_id,
                role: assignment.role.clone(),
                activity_type_id: program.activity_type_id.clone(),
                date: program.date,
                program_id: Some(program.id),
                created_at: now,
            };
            if self.index.remove(&record) {
                self.entries.push(LedgerEntry::Tombstone(record));
                appended += 1;
            } else {
                tracing::warn!(
                    program_id = %program.id,
                    person_id,
                    role = %assignment.role,
                    "No served entry to cancel"
                );
            }
        }
        appended
    }

    /// Appends a `GroupTurn`; `turn` is the rotation ordinal handed out with it
    pub fn record_group_turn(&mut self, group_id: u32, date: NaiveDate, turn: u64) {
        let latest = self.index.group_turns.entry(group_id).or_insert((date, turn));
        if (date, turn) > *latest {
            *latest = (date, turn);
        }
        self.entries.push(LedgerEntry::GroupTurn {
            group_id,
            date,
            turn,
            recorded_at: Utc::now(),
        });
    }

    pub fn last_served(&self, person_id: PersonId, role: &str) -> Option<NaiveDate> {
        self.index.last_served(person_id, role)
    }

    pub fn group_last_assigned(&self, group_id: u32) -> Option<NaiveDate> {
        self.index.group_turns.get(&group_id).map(|&(date, _)| date)
    }

    /// Date and ordinal of the group's latest recorded turn
    pub fn group_last_turn(&self, group_id: u32) -> Option<(NaiveDate, u64)> {
        self.index.group_turns.get(&group_id).copied()
    }

    pub fn service_count(&self, person_id: PersonId, role: &str) -> u32 {
        self.index.service_count(person_id, role)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Immutable copy of the query side, safe to use without holding a lock
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            index: self.index.clone(),
            entry_count: self.entries.len(),
        }
    }
}

impl ServiceHistory for AssignmentLedger {
    fn last_served(&self, person_id: PersonId, role: &str) -> Option<NaiveDate> {
        self.index.last_served(person_id, role)
    }
}

/// Point-in-time view of the ledger's queries
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    index: ServedIndex,
    entry_count: usize,
}

impl LedgerSnapshot {
    pub fn group_last_assigned(&self, group_id: u32) -> Option<NaiveDate> {
        self.index.group_turns.get(&group_id).map(|&(date, _)| date)
    }

    /// Date and ordinal of the group's latest recorded turn
    pub fn group_last_turn(&self, group_id: u32) -> Option<(NaiveDate, u64)> {
        self.index.group_turns.get(&group_id).copied()
    }

    pub fn service_count(&self, person_id: PersonId, role: &str) -> u32 {
        self.index.service_count(person_id, role)
    }

    /// Ledger length when the snapshot was taken
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }
}

impl ServiceHistory for LedgerSnapshot {
    fn last_served(&self, person_id: PersonId, role: &str) -> Option<NaiveDate> {
        self.index.last_served(person_id, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::{Assignment, AssignmentStrategy, DraftProgram};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn program(date: NaiveDate, people: &[(&str, PersonId)]) -> Program {
        Program::from_draft(DraftProgram {
            date,
            activity_type_id: "sunday-service".to_string(),
            assignments: people
                .iter()
                .map(|(role, id)| Assignment {
                    role: role.to_string(),
                    slot: 0,
                    person_id: Some(*id),
                    strategy: AssignmentStrategy::DeterministicRotation,
                })
                .collect(),
            unfilled: Vec::new(),
        })
    }

    #[test]
    fn last_served_tracks_latest_date_per_role() {
        let mut ledger = AssignmentLedger::new();
        ledger.record_commit(&program(d(2024, 1, 7), &[("Preacher", 1), ("Usher", 2)]));
        ledger.record_commit(&program(d(2024, 2, 4), &[("Preacher", 1)]));

        assert_eq!(ledger.last_served(1, "Preacher"), Some(d(2024, 2, 4)));
        assert_eq!(ledger.last_served(2, "Usher"), Some(d(2024, 1, 7)));
        assert_eq!(ledger.last_served(2, "Preacher"), None);
        assert_eq!(ledger.service_count(1, "Preacher"), 2);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn cancellation_appends_tombstones_without_rewriting_history() {
        let mut ledger = AssignmentLedger::new();
        let first = program(d(2024, 1, 7), &[("Preacher", 1)]);
        let second = program(d(2024, 2, 4), &[("Preacher", 1)]);
        ledger.record_commit(&first);
        ledger.record_commit(&second);

        assert_eq!(ledger.record_cancellation(&second), 1);
        assert_eq!(ledger.last_served(1, "Preacher"), Some(d(2024, 1, 7)));
        assert_eq!(ledger.len(), 3);
        assert!(matches!(ledger.entries()[1], LedgerEntry::Served(_)));
        assert!(matches!(ledger.entries()[2], LedgerEntry::Tombstone(_)));
    }

    #[test]
    fn cancelling_unknown_service_appends_nothing() {
        let mut ledger = AssignmentLedger::new();
        assert_eq!(
            ledger.record_cancellation(&program(d(2024, 1, 7), &[("Preacher", 1)])),
            0
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn group_turns_keep_latest_date() {
        let mut ledger = AssignmentLedger::new();
        ledger.record_group_turn(2, d(2024, 3, 10), 4);
        ledger.record_group_turn(2, d(2024, 3, 3), 5);
        assert_eq!(ledger.group_last_assigned(2), Some(d(2024, 3, 10)));
        assert_eq!(ledger.group_last_turn(2), Some((d(2024, 3, 10), 4)));
        assert_eq!(ledger.group_last_assigned(1), None);

        ledger.record_group_turn(2, d(2024, 3, 10), 6);
        assert_eq!(ledger.group_last_turn(2), Some((d(2024, 3, 10), 6)));
    }

    #[test]
    fn snapshot_is_isolated_from_later_appends() {
        let mut ledger = AssignmentLedger::new();
        ledger.record_commit(&program(d(2024, 1, 7), &[("Preacher", 1)]));
        let snapshot = ledger.snapshot();
        ledger.record_commit(&program(d(2024, 2, 4), &[("Preacher", 1)]));

        assert_eq!(snapshot.last_served(1, "Preacher"), Some(d(2024, 1, 7)));
        assert_eq!(snapshot.entry_count(), 1);
        assert_eq!(ledger.last_served(1, "Preacher"), Some(d(2024, 2, 4)));
    }
}
