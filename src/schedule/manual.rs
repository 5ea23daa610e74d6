use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use super::roster::Roster;
use super::types::{AssignmentStrategy, PersonId, Program, ProgramStatus};
use crate::error::{Result, SchedulerError};

fn ensure_draft(program: &Program) -> Result<()> {
    if program.status != ProgramStatus::Draft {
        return Err(SchedulerError::InvalidState(format!(
            "program {} is {:?}; only drafts can be edited",
            program.id, program.status
        )));
    }
    Ok(())
}

/// Refills the slots of `role` (or of every role) from a shuffled candidate pool.
///
/// People already holding a slot outside the targeted roles are never picked,
/// so the program stays free of duplicates.
pub fn randomize<R: Rng + ?Sized>(
    program: &mut Program,
    roster: &Roster,
    role: Option<&str>,
    rng: &mut R,
) -> Result<()> {
    ensure_draft(program)?;
    if let Some(role) = role {
        if !program.assignments.iter().any(|a| a.role == role) {
            return Err(SchedulerError::config(format!(
                "program has no role named {role}"
            )));
        }
    }
    let targeted = |r: &str| role.map_or(true, |wanted| wanted == r);

    let mut used: HashSet<PersonId> = program
        .assignments
        .iter()
        .filter(|a| !targeted(&a.role))
        .filter_map(|a| a.person_id)
        .collect();

    let mut roles: Vec<String> = Vec::new();
    for a in &program.assignments {
        if targeted(&a.role) && !roles.contains(&a.role) {
            roles.push(a.role.clone());
        }
    }

    for role_name in roles {
        let mut pool: Vec<PersonId> = roster
            .qualified(&role_name, program.date)
            .iter()
            .map(|p| p.id)
            .collect();
        pool.shuffle(rng);
        let mut pool = pool.into_iter();

        for assignment in program
            .assignments
            .iter_mut()
            .filter(|a| a.role == role_name)
        {
            let pick = pool.by_ref().find(|id| !used.contains(id));
            if let Some(id) = pick {
                used.insert(id);
            }
            assignment.person_id = pick;
            assignment.strategy = AssignmentStrategy::ManualRandom;
        }
    }

    program.refresh_unfilled();
    tracing::info!(program_id = %program.id, role = ?role, "Randomized program roles");
    Ok(())
}

/// Hand-picks `person_id` for one slot, or clears the slot when `None`.
/// Ranking is bypassed; the no-duplicate rule is not.
pub fn reassign(
    program: &mut Program,
    roster: &Roster,
    role: &str,
    slot: u32,
    person_id: Option<PersonId>,
) -> Result<()> {
    ensure_draft(program)?;
    let position = program
        .assignments
        .iter()
        .position(|a| a.role == role && a.slot == slot)
        .ok_or_else(|| {
            SchedulerError::config(format!("program has no slot {slot} for role {role}"))
        })?;

    if let Some(id) = person_id {
        let person = roster.get(id).ok_or(SchedulerError::PersonNotFound(id))?;
        if let Some(other) = program
            .assignments
            .iter()
            .enumerate()
            .find(|(i, a)| *i != position && a.person_id == Some(id))
            .map(|(_, a)| a)
        {
            return Err(SchedulerError::DuplicatePerson {
                person_id: id,
                role: other.role.clone(),
            });
        }
        if !person.qualified_for(role, program.date) {
            tracing::warn!(person_id = id, role, "Manual pick is not qualified for role");
        }
    }

    let assignment = &mut program.assignments[position];
    assignment.person_id = person_id;
    assignment.strategy = AssignmentStrategy::ManualPick;
    program.refresh_unfilled();
    tracing::info!(program_id = %program.id, role, slot, person_id = ?person_id, "Reassigned slot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::{Assignment, DraftProgram, Person, Qualification, UnfilledRole};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn roster() -> Roster {
        let people = (1..=6)
            .map(|id| {
                let mut p = Person::new(id, format!("M{id}"));
                p.qualifications = ["Preacher", "Usher"]
                    .iter()
                    .map(|r| Qualification {
                        role: r.to_string(),
                        qualified_since: d(2020, 1, 1),
                    })
                    .collect();
                p
            })
            .collect();
        Roster::new(people).unwrap()
    }

    fn slot(role: &str, slot: u32, person_id: Option<PersonId>) -> Assignment {
        Assignment {
            role: role.to_string(),
            slot,
            person_id,
            strategy: AssignmentStrategy::DeterministicRotation,
        }
    }

    fn draft() -> Program {
        Program::from_draft(DraftProgram {
            date: d(2024, 3, 10),
            activity_type_id: "sunday-service".to_string(),
            assignments: vec![
                slot("Preacher", 0, Some(1)),
                slot("Usher", 0, Some(2)),
                slot("Usher", 1, None),
            ],
            unfilled: vec![UnfilledRole {
                role: "Usher".to_string(),
                slot: 1,
                reason: "no qualified, available candidates".to_string(),
            }],
        })
    }

    #[test]
    fn randomize_role_keeps_other_roles_and_avoids_duplicates() {
        let mut program = draft();
        let mut rng = StdRng::seed_from_u64(7);
        randomize(&mut program, &roster(), Some("Usher"), &mut rng).unwrap();

        assert_eq!(program.assignments[0].person_id, Some(1));
        let ushers: Vec<_> = program.assignments[1..]
            .iter()
            .map(|a| a.person_id.unwrap())
            .collect();
        assert!(!ushers.contains(&1));
        assert_ne!(ushers[0], ushers[1]);
        assert!(program.unfilled.is_empty());
        assert!(program.assignments[1..]
            .iter()
            .all(|a| a.strategy == AssignmentStrategy::ManualRandom));
    }

    #[test]
    fn randomize_is_reproducible_with_seed() {
        let mut a = draft();
        let mut b = a.clone();
        randomize(&mut a, &roster(), None, &mut StdRng::seed_from_u64(42)).unwrap();
        randomize(&mut b, &roster(), None, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.assignments, b.assignments);
    }

    #[test]
    fn randomize_unknown_role_fails() {
        let mut program = draft();
        let err = randomize(&mut program, &roster(), Some("Deacon"), &mut StdRng::seed_from_u64(1));
        assert!(err.is_err());
    }

    #[test]
    fn reassign_rejects_duplicate_person() {
        let mut program = draft();
        let err = reassign(&mut program, &roster(), "Usher", 1, Some(1)).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicatePerson { person_id: 1, .. }));
    }

    #[test]
    fn reassign_fills_and_clears_slots() {
        let mut program = draft();
        reassign(&mut program, &roster(), "Usher", 1, Some(5)).unwrap();
        assert_eq!(program.assignments[2].person_id, Some(5));
        assert_eq!(program.assignments[2].strategy, AssignmentStrategy::ManualPick);
        assert!(program.unfilled.is_empty());

        reassign(&mut program, &roster(), "Preacher", 0, None).unwrap();
        assert_eq!(program.unfilled.len(), 1);
        assert_eq!(program.unfilled[0].reason, "cleared by manual override");
    }

    #[test]
    fn reassign_same_person_to_own_slot_is_allowed() {
        let mut program = draft();
        reassign(&mut program, &roster(), "Usher", 0, Some(2)).unwrap();
        assert_eq!(program.assignments[1].person_id, Some(2));
    }

    #[test]
    fn reassign_unknown_person_or_slot_fails() {
        let mut program = draft();
        assert!(matches!(
            reassign(&mut program, &roster(), "Usher", 1, Some(99)),
            Err(SchedulerError::PersonNotFound(99))
        ));
        assert!(reassign(&mut program, &roster(), "Usher", 5, Some(3)).is_err());
    }

    #[test]
    fn published_programs_are_not_editable() {
        let mut program = draft();
        program.status = ProgramStatus::Published;
        let err = reassign(&mut program, &roster(), "Usher", 1, Some(3)).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidState(_)));
    }
}
