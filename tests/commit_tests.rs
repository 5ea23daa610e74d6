mod common;

use std::sync::Arc;

use common::{d, service};
use service_rota::form::{GenerateRequest, RandomizeRequest, ReassignRequest};
use service_rota::schedule::{AssignmentStrategy, LedgerEntry, ProgramStatus};
use service_rota::{ErrorKind, SchedulerError};

fn sunday(date: &str) -> GenerateRequest {
    GenerateRequest {
        activity_type_id: "sunday-service".to_string(),
        date: date.to_string(),
    }
}

#[tokio::test]
async fn concurrent_commits_for_one_target_have_one_winner() {
    let service = service();
    let first = service.generate(&sunday("2024-03-10")).await.unwrap();
    let second = service.generate(&sunday("2024-03-10")).await.unwrap();
    assert_ne!(first.id, second.id);

    let (a, b) = tokio::join!(service.commit(first.id), service.commit(second.id));
    let outcomes = [a, b];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(loser, SchedulerError::DuplicateTarget { .. }));

    let published = service.programs().await;
    assert_eq!(
        published
            .iter()
            .filter(|p| p.status == ProgramStatus::Published)
            .count(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_tasks_commit_a_target_once() {
    let service = Arc::new(service());
    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(service.generate(&sunday("2024-03-17")).await.unwrap().id);
    }

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.commit(id).await })
        })
        .collect();

    let mut committed = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::DuplicateTarget);
                duplicates += 1;
            }
        }
    }
    assert_eq!(committed, 1);
    assert_eq!(duplicates, 5);

    // Three roles, one published program
    let ledger = service.ledger();
    let ledger = ledger.read().await;
    let served = ledger
        .entries()
        .iter()
        .filter(|e| matches!(e, LedgerEntry::Served(_)))
        .count();
    assert_eq!(served, 3);
}

#[tokio::test]
async fn committed_preacher_rotates_out_next_week() {
    let service = service();
    let week1 = service.generate(&sunday("2024-03-10")).await.unwrap();
    assert_eq!(week1.assignments[0].person_id, Some(1));
    service.commit(week1.id).await.unwrap();

    let week2 = service.generate(&sunday("2024-03-17")).await.unwrap();
    assert_eq!(week2.assignments[0].person_id, Some(2));

    let ledger = service.ledger();
    assert_eq!(
        ledger.read().await.last_served(1, "Preacher"),
        Some(d(2024, 3, 10))
    );
}

#[tokio::test]
async fn cancel_frees_the_target_and_tombstones_history() {
    let service = service();
    let program = service.generate(&sunday("2024-03-10")).await.unwrap();
    service.commit(program.id).await.unwrap();

    let cancelled = service.cancel(program.id).await.unwrap();
    assert_eq!(cancelled.status, ProgramStatus::Cancelled);
    assert_eq!(
        service.ledger().read().await.last_served(1, "Preacher"),
        None
    );

    // The same preacher is fair game again and the date can be republished
    let again = service.generate(&sunday("2024-03-10")).await.unwrap();
    assert_eq!(again.assignments[0].person_id, Some(1));
    service.commit(again.id).await.unwrap();

    let err = service.commit(program.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn drafts_can_be_discarded_but_published_programs_cannot() {
    let service = service();
    let draft = service.generate(&sunday("2024-03-10")).await.unwrap();
    service.discard(draft.id).await.unwrap();
    assert_eq!(
        service.program(draft.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let program = service.generate(&sunday("2024-03-10")).await.unwrap();
    service.commit(program.id).await.unwrap();
    assert_eq!(
        service.discard(program.id).await.unwrap_err().kind(),
        ErrorKind::InvalidState
    );
}

#[tokio::test]
async fn manual_edits_apply_to_drafts_only() {
    let service = service();
    let program = service.generate(&sunday("2024-03-10")).await.unwrap();

    let edited = service
        .reassign(
            program.id,
            &ReassignRequest {
                role: "Preacher".to_string(),
                slot: 0,
                person_id: Some(3),
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.assignments[0].person_id, Some(3));
    assert_eq!(edited.assignments[0].strategy, AssignmentStrategy::ManualPick);
    assert_eq!(service.program(program.id).await.unwrap(), edited);

    // 3 already preaches, so they cannot also lead worship
    let err = service
        .reassign(
            program.id,
            &ReassignRequest {
                role: "Worship Leader".to_string(),
                slot: 0,
                person_id: Some(3),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicatePerson { person_id: 3, .. }));
    assert_eq!(service.program(program.id).await.unwrap(), edited);

    let shuffled = service
        .randomize(
            program.id,
            &RandomizeRequest {
                role: Some("Usher".to_string()),
                seed: Some(7),
            },
        )
        .await
        .unwrap();
    let usher = &shuffled.assignments[2];
    assert_eq!(usher.strategy, AssignmentStrategy::ManualRandom);
    assert!(usher.person_id.is_some());
    assert_ne!(usher.person_id, Some(3));
    assert_eq!(shuffled.assignments[0], edited.assignments[0]);

    service.commit(program.id).await.unwrap();
    let err = service
        .randomize(program.id, &RandomizeRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}
