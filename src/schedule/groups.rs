//! Rotating work groups (cleaning duty and similar).
//!
//! Members are dealt round-robin in id order, so partitioning an unchanged
//! roster always gives the same groups. Turns go to the group that waited
//! longest, by date and then by turn ordinal, which makes k consecutive turns
//! visit each of k groups once even when several turns share a date.

use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::NaiveDate;

use super::ledger::AssignmentLedger;
use super::roster::Roster;
use super::types::{CleaningGroup, PersonId};
use crate::error::{Result, SchedulerError};

fn validate_group_count(group_count: usize, members: usize) -> Result<()> {
    if group_count == 0 {
        return Err(SchedulerError::config("group count must be at least 1"));
    }
    if group_count > members {
        return Err(SchedulerError::config(format!(
            "group count {group_count} exceeds the {members} eligible members"
        )));
    }
    Ok(())
}

/// Splits the active, group-eligible roster into `group_count` groups
pub fn partition(roster: &Roster, group_count: usize) -> Result<Vec<CleaningGroup>> {
    let members = roster.group_members();
    validate_group_count(group_count, members.len())?;

    let mut groups: Vec<CleaningGroup> = (0..group_count as u32)
        .map(|seq| CleaningGroup {
            id: seq + 1,
            members: Vec::new(),
            last_assigned_date: None,
            last_turn: 0,
            sequence: seq,
        })
        .collect();
    for (i, member) in members.into_iter().enumerate() {
        groups[i % group_count].members.push(member);
    }

    tracing::info!(group_count, "Partitioned roster into groups");
    Ok(groups)
}

/// Re-partitions after roster changes, keeping group identity and turn history.
///
/// Surviving groups are the `group_count` lowest sequence positions. Members stay
/// in their group while it exists and is not over its size limit; over-full groups
/// shed their highest ids first. Joiners and displaced members are then placed in
/// id order into the group with the largest shortfall.
pub fn repartition(
    existing: &[CleaningGroup],
    roster: &Roster,
    group_count: usize,
) -> Result<Vec<CleaningGroup>> {
    let members = roster.group_members();
    validate_group_count(group_count, members.len())?;
    let current: HashSet<PersonId> = members.iter().copied().collect();

    let mut surviving: Vec<CleaningGroup> = existing.to_vec();
    surviving.sort_by_key(|g| g.sequence);
    surviving.truncate(group_count);

    let mut next_id = existing.iter().map(|g| g.id).max().unwrap_or(0) + 1;
    let mut next_seq = surviving.last().map(|g| g.sequence + 1).unwrap_or(0);
    while surviving.len() < group_count {
        surviving.push(CleaningGroup {
            id: next_id,
            members: Vec::new(),
            last_assigned_date: None,
            last_turn: 0,
            sequence: next_seq,
        });
        next_id += 1;
        next_seq += 1;
    }

    // Keep members still on the roster, each in at most one group
    let mut placed: HashSet<PersonId> = HashSet::new();
    for group in &mut surviving {
        group
            .members
            .retain(|m| current.contains(m) && placed.insert(*m));
        group.members.sort_unstable();
    }

    // Largest retained groups receive the extra seats, so fewer people move
    let base = members.len() / group_count;
    let extra = members.len() % group_count;
    let mut order: Vec<usize> = (0..surviving.len()).collect();
    order.sort_by_key(|&i| (Reverse(surviving[i].members.len()), surviving[i].sequence));
    let mut targets = vec![base; surviving.len()];
    for &i in order.iter().take(extra) {
        targets[i] = base + 1;
    }

    let mut pool: Vec<PersonId> = members.into_iter().filter(|m| !placed.contains(m)).collect();
    for (group, &target) in surviving.iter_mut().zip(&targets) {
        while group.members.len() > target {
            if let Some(evicted) = group.members.pop() {
                pool.push(evicted);
            }
        }
    }
    pool.sort_unstable();

    for member in pool {
        let slot = (0..surviving.len())
            .filter(|&i| surviving[i].members.len() < targets[i])
            .max_by_key(|&i| {
                (
                    targets[i] - surviving[i].members.len(),
                    Reverse(surviving[i].sequence),
                )
            });
        match slot {
            Some(i) => surviving[i].members.push(member),
            None => {
                return Err(SchedulerError::InvalidState(format!(
                    "no group has room for member {member}"
                )))
            }
        }
    }
    for group in &mut surviving {
        group.members.sort_unstable();
    }

    tracing::info!(group_count, "Re-partitioned roster into groups");
    Ok(surviving)
}

/// The group whose turn is next: oldest (or no) last turn date, then the
/// earliest turn ordinal, then lowest sequence. `cycle_index` is the ordinal
/// the turn will be handed out under.
pub fn next_turn(groups: &[CleaningGroup], cycle_index: u64) -> Result<&CleaningGroup> {
    let group = groups
        .iter()
        .min_by_key(|g| (g.last_assigned_date, g.last_turn, g.sequence))
        .ok_or_else(|| SchedulerError::config("no groups to rotate"))?;
    tracing::debug!(cycle_index, group_id = group.id, "Selected next group");
    Ok(group)
}

/// Ordinal for the next turn handed out to `groups`
pub fn next_cycle_index(groups: &[CleaningGroup]) -> u64 {
    groups.iter().map(|g| g.last_turn).max().unwrap_or(0) + 1
}

/// Picks the next group and stamps `date` and a fresh turn ordinal on it.
/// Turn dates must not go backwards, otherwise the cycle guarantee breaks.
pub fn take_turn(groups: &mut [CleaningGroup], date: NaiveDate) -> Result<CleaningGroup> {
    if let Some(latest) = groups.iter().filter_map(|g| g.last_assigned_date).max() {
        if date < latest {
            return Err(SchedulerError::config(format!(
                "turn date {date} precedes the latest turn on {latest}"
            )));
        }
    }
    let cycle_index = next_cycle_index(groups);
    let chosen = next_turn(groups, cycle_index)?.id;
    let group = groups
        .iter_mut()
        .find(|g| g.id == chosen)
        .ok_or_else(|| SchedulerError::InvalidState(format!("group {chosen} vanished")))?;
    group.last_assigned_date = Some(date);
    group.last_turn = cycle_index;
    Ok(group.clone())
}

/// Restores each group's last turn from the ledger
pub fn sync_from_ledger(groups: &mut [CleaningGroup], ledger: &AssignmentLedger) {
    for group in groups.iter_mut() {
        let Some((date, turn)) = ledger.group_last_turn(group.id) else {
            continue;
        };
        if (Some(date), turn) > (group.last_assigned_date, group.last_turn) {
            group.last_assigned_date = Some(date);
            group.last_turn = turn;
        }
    }
}
