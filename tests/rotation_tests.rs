mod common;

use std::collections::HashSet;

use common::{catalog, congregation, d, person, served};
use service_rota::schedule::{assign, AssignmentLedger, Roster};

#[test]
fn never_served_preacher_is_chosen() {
    let roster = Roster::new(vec![
        person(1, &["Preacher"], 0),
        person(2, &["Preacher"], 0),
        person(3, &["Preacher"], 0),
        person(4, &["Preacher"], 0),
        person(5, &["Worship Leader"], 0),
        person(6, &["Usher"], 0),
    ])
    .unwrap();
    let mut ledger = AssignmentLedger::new();
    served(&mut ledger, 1, "Preacher", d(2024, 1, 1));
    served(&mut ledger, 2, "Preacher", d(2024, 2, 1));
    served(&mut ledger, 3, "Preacher", d(2024, 3, 1));

    let draft = assign(d(2024, 3, 10), "sunday-service", &roster, &catalog(), &ledger).unwrap();
    assert_eq!(draft.assignments[0].role, "Preacher");
    assert_eq!(draft.assignments[0].person_id, Some(4));
    assert_eq!(draft.assignments[1].person_id, Some(5));
    assert_eq!(draft.assignments[2].person_id, Some(6));
    assert!(draft.unfilled.is_empty());
}

#[test]
fn older_service_wins_even_against_higher_priority() {
    let roster = Roster::new(vec![
        person(1, &["Preacher"], 0),
        person(2, &["Preacher"], 50),
    ])
    .unwrap();
    let mut ledger = AssignmentLedger::new();
    served(&mut ledger, 1, "Preacher", d(2023, 12, 3));
    served(&mut ledger, 2, "Preacher", d(2024, 2, 4));

    let draft = assign(d(2024, 3, 10), "sunday-service", &roster, &catalog(), &ledger).unwrap();
    assert_eq!(draft.assignments[0].person_id, Some(1));
}

#[test]
fn priority_breaks_recency_ties_then_id() {
    let roster = Roster::new(vec![
        person(1, &["Preacher"], 1),
        person(2, &["Preacher"], 7),
        person(3, &["Preacher"], 7),
    ])
    .unwrap();
    let draft = assign(
        d(2024, 3, 10),
        "sunday-service",
        &roster,
        &catalog(),
        &AssignmentLedger::new(),
    )
    .unwrap();
    assert_eq!(draft.assignments[0].person_id, Some(2));
}

#[test]
fn identical_inputs_give_identical_drafts() {
    let roster = congregation();
    let mut ledger = AssignmentLedger::new();
    served(&mut ledger, 1, "Preacher", d(2024, 2, 4));
    served(&mut ledger, 8, "Usher", d(2024, 2, 4));

    let first = assign(d(2024, 3, 10), "midweek", &roster, &catalog(), &ledger).unwrap();
    let second = assign(d(2024, 3, 10), "midweek", &roster, &catalog(), &ledger).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn no_person_appears_twice_across_roster_shapes() {
    // Everybody qualifies for everything, so duplicates would be easy to make
    for size in 1..=8u64 {
        let people = (1..=size)
            .map(|id| person(id, &["Preacher", "Worship Leader", "Usher"], (id % 3) as i32))
            .collect();
        let roster = Roster::new(people).unwrap();
        for activity in ["sunday-service", "midweek"] {
            let draft = assign(
                d(2024, 3, 10),
                activity,
                &roster,
                &catalog(),
                &AssignmentLedger::new(),
            )
            .unwrap();
            let people: Vec<_> = draft.assigned_people().collect();
            let unique: HashSet<_> = people.iter().collect();
            assert_eq!(people.len(), unique.len(), "size {size}, {activity}");
            assert_eq!(
                people.len() + draft.unfilled.len(),
                draft.assignments.len()
            );
        }
    }
}

#[test]
fn unfillable_role_does_not_abort_program() {
    let roster = Roster::new(vec![person(1, &["Preacher"], 0), person(2, &["Usher"], 0)])
        .unwrap();
    let draft = assign(
        d(2024, 3, 10),
        "sunday-service",
        &roster,
        &catalog(),
        &AssignmentLedger::new(),
    )
    .unwrap();
    assert_eq!(draft.assignments.len(), 3);
    assert_eq!(draft.unfilled.len(), 1);
    assert_eq!(draft.unfilled[0].role, "Worship Leader");
    assert_eq!(draft.assignments[2].person_id, Some(2));
}

#[test]
fn blacked_out_people_are_skipped() {
    let mut away = person(1, &["Preacher"], 0);
    away.blackouts.push(service_rota::schedule::Blackout {
        start: d(2024, 3, 9),
        end: d(2024, 3, 11),
    });
    let roster = Roster::new(vec![away, person(2, &["Preacher"], 0)]).unwrap();
    let draft = assign(
        d(2024, 3, 10),
        "sunday-service",
        &roster,
        &catalog(),
        &AssignmentLedger::new(),
    )
    .unwrap();
    assert_eq!(draft.assignments[0].person_id, Some(2));
}
