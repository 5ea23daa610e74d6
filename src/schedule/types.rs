use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PersonId = u64;

/// A role a person may serve in, from a given date on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub role: String,
    pub qualified_since: NaiveDate,
}

/// Inclusive range of dates a person cannot serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blackout {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Blackout {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Member snapshot as supplied by the membership service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub full_name: String,
    pub qualifications: Vec<Qualification>,
    /// Higher wins when recency ties
    pub priority: i32,
    pub blackouts: Vec<Blackout>,
    pub weekly_exclusions: Vec<Weekday>,
    pub active: bool,
    pub group_eligible: bool,
}

impl Person {
    pub fn new(id: PersonId, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            qualifications: Vec::new(),
            priority: 0,
            blackouts: Vec::new(),
            weekly_exclusions: Vec::new(),
            active: true,
            group_eligible: true,
        }
    }

    pub fn qualified_for(&self, role: &str, date: NaiveDate) -> bool {
        self.qualifications
            .iter()
            .any(|q| q.role == role && q.qualified_since <= date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRequirement {
    pub role: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub display_order: u32,
}

fn default_count() -> u32 {
    1
}

/// A recurring program type and the roles it needs filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityType {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub roles: Vec<RoleRequirement>,
}

fn default_version() -> u32 {
    1
}

/// How an assignment came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStrategy {
    DeterministicRotation,
    ManualRandom,
    ManualPick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub role: String,
    /// Position within the role when more than one person is required
    pub slot: u32,
    pub person_id: Option<PersonId>,
    pub strategy: AssignmentStrategy,
}

/// A role slot the scheduler could not fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfilledRole {
    pub role: String,
    pub slot: u32,
    pub reason: String,
}

/// Pure scheduler output; identical inputs give an identical draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftProgram {
    pub date: NaiveDate,
    pub activity_type_id: String,
    pub assignments: Vec<Assignment>,
    pub unfilled: Vec<UnfilledRole>,
}

impl DraftProgram {
    pub fn assigned_people(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.assignments.iter().filter_map(|a| a.person_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramStatus {
    Draft,
    Published,
    Cancelled,
}

/// A stored program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub date: NaiveDate,
    pub activity_type_id: String,
    pub assignments: Vec<Assignment>,
    pub unfilled: Vec<UnfilledRole>,
    pub status: ProgramStatus,
    pub created_at: DateTime<Utc>,
}

impl Program {
    pub fn from_draft(draft: DraftProgram) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: draft.date,
            activity_type_id: draft.activity_type_id,
            assignments: draft.assignments,
            unfilled: draft.unfilled,
            status: ProgramStatus::Draft,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> TargetKey {
        TargetKey::new(&self.activity_type_id, self.date)
    }

    /// Recomputes the unfilled list from the current assignments
    pub fn refresh_unfilled(&mut self) {
        let previous = std::mem::take(&mut self.unfilled);
        self.unfilled = self
            .assignments
            .iter()
            .filter(|a| a.person_id.is_none())
            .map(|a| {
                let reason = previous
                    .iter()
                    .find(|u| u.role == a.role && u.slot == a.slot)
                    .map(|u| u.reason.clone())
                    .unwrap_or_else(|| "cleared by manual override".to_string());
                UnfilledRole {
                    role: a.role.clone(),
                    slot: a.slot,
                    reason,
                }
            })
            .collect();
    }
}

/// Uniqueness key for published programs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey {
    pub activity_type_id: String,
    pub date: NaiveDate,
}

impl TargetKey {
    pub fn new(activity_type_id: &str, date: NaiveDate) -> Self {
        Self {
            activity_type_id: activity_type_id.to_string(),
            date,
        }
    }
}

/// Append-only fact of someone serving a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub person_id: PersonId,
    pub role: String,
    pub activity_type_id: String,
    pub date: NaiveDate,
    pub program_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningGroup {
    pub id: u32,
    pub members: Vec<PersonId>,
    pub last_assigned_date: Option<NaiveDate>,
    /// Ordinal of the group's latest turn across all groups; 0 before its first
    #[serde(default)]
    pub last_turn: u64,
    pub sequence: u32,
}

/// One (date, activity) pair of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTarget {
    pub date: NaiveDate,
    pub activity_type_id: String,
}
