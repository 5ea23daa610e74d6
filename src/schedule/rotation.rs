use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use chrono::NaiveDate;

use super::catalog::RoleCatalog;
use super::ledger::ServiceHistory;
use super::roster::Roster;
use super::types::{Assignment, AssignmentStrategy, DraftProgram, PersonId, UnfilledRole};
use crate::error::Result;

/// A qualified, available person for one role on one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub person_id: PersonId,
    pub priority: i32,
}

/// Candidates for one required role, before any ranking
#[derive(Debug, Clone)]
pub struct RolePool {
    pub role: String,
    pub count: u32,
    pub candidates: Vec<Candidate>,
}

/// A target resolved against the catalog and roster, waiting for history
#[derive(Debug, Clone)]
pub struct PreparedTarget {
    pub date: NaiveDate,
    pub activity_type_id: String,
    pub pools: Vec<RolePool>,
}

/// Ranking key: never-served first, then oldest service, then priority, then id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RankKey {
    last_served: Option<NaiveDate>,
    priority: i32,
    person_id: PersonId,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // None sorts before Some, so people who never served come first
        self.last_served
            .cmp(&other.last_served)
            .then_with(|| Reverse(self.priority).cmp(&Reverse(other.priority)))
            .then_with(|| self.person_id.cmp(&other.person_id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Resolves the activity's roles and builds one candidate pool per role.
/// Fails only when the activity type is unknown or malformed.
pub fn prepare(
    date: NaiveDate,
    activity_type_id: &str,
    roster: &Roster,
    catalog: &RoleCatalog,
) -> Result<PreparedTarget> {
    let activity = catalog.resolve(activity_type_id)?;
    let pools = activity
        .roles
        .iter()
        .map(|req| RolePool {
            role: req.role.clone(),
            count: req.count,
            candidates: roster
                .qualified(&req.role, date)
                .into_iter()
                .map(|p| Candidate {
                    person_id: p.id,
                    priority: p.priority,
                })
                .collect(),
        })
        .collect();

    Ok(PreparedTarget {
        date,
        activity_type_id: activity.id.clone(),
        pools,
    })
}

/// Greedy selection in role order. Nobody is picked twice within the program;
/// a role with no remaining candidate is reported as unfilled.
pub fn select<H: ServiceHistory + ?Sized>(prepared: &PreparedTarget, history: &H) -> DraftProgram {
    let mut used: HashSet<PersonId> = HashSet::new();
    let mut assignments = Vec::new();
    let mut unfilled = Vec::new();

    for pool in &prepared.pools {
        let mut ranked: Vec<RankKey> = pool
            .candidates
            .iter()
            .filter(|c| !used.contains(&c.person_id))
            .map(|c| RankKey {
                last_served: history.last_served(c.person_id, &pool.role),
                priority: c.priority,
                person_id: c.person_id,
            })
            .collect();
        ranked.sort();
        let mut ranked = ranked.into_iter();

        for slot in 0..pool.count {
            match ranked.next() {
                Some(pick) => {
                    used.insert(pick.person_id);
                    assignments.push(Assignment {
                        role: pool.role.clone(),
                        slot,
                        person_id: Some(pick.person_id),
                        strategy: AssignmentStrategy::DeterministicRotation,
                    });
                }
                None => {
                    let reason = if pool.candidates.is_empty() {
                        "no qualified, available candidates".to_string()
                    } else {
                        "every qualified candidate is already assigned in this program".to_string()
                    };
                    tracing::debug!(
                        activity_type_id = %prepared.activity_type_id,
                        date = %prepared.date,
                        role = %pool.role,
                        slot,
                        "Role left unfilled"
                    );
                    assignments.push(Assignment {
                        role: pool.role.clone(),
                        slot,
                        person_id: None,
                        strategy: AssignmentStrategy::DeterministicRotation,
                    });
                    unfilled.push(UnfilledRole {
                        role: pool.role.clone(),
                        slot,
                        reason,
                    });
                }
            }
        }
    }

    DraftProgram {
        date: prepared.date,
        activity_type_id: prepared.activity_type_id.clone(),
        assignments,
        unfilled,
    }
}

/// Deterministic draft for one (date, activity) target
pub fn assign<H: ServiceHistory + ?Sized>(
    date: NaiveDate,
    activity_type_id: &str,
    roster: &Roster,
    catalog: &RoleCatalog,
    history: &H,
) -> Result<DraftProgram> {
    let prepared = prepare(date, activity_type_id, roster, catalog)?;
    let draft = select(&prepared, history);
    tracing::info!(
        activity_type_id,
        date = %date,
        filled = draft.assignments.len() - draft.unfilled.len(),
        unfilled = draft.unfilled.len(),
        "Generated draft program"
    );
    Ok(draft)
}
