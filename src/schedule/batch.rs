use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;

use super::catalog::RoleCatalog;
use super::ledger::{AssignmentLedger, LedgerSnapshot, ServiceHistory};
use super::roster::Roster;
use super::rotation::{self, PreparedTarget};
use super::types::{BatchTarget, PersonId, Program};
use crate::error::{ErrorKind, Result, SchedulerError};
use crate::repository::ProgramRepository;

/// A submitted target, kept with its raw labels so failures can be echoed back
#[derive(Debug)]
pub struct PendingTarget {
    pub date: String,
    pub activity_type_id: String,
    pub parsed: Result<BatchTarget>,
}

impl From<BatchTarget> for PendingTarget {
    fn from(target: BatchTarget) -> Self {
        Self {
            date: target.date.to_string(),
            activity_type_id: target.activity_type_id.clone(),
            parsed: Ok(target),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchOutcome {
    DraftProgram { program: Program },
    Failure { kind: ErrorKind, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub date: String,
    pub activity_type_id: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchEntry {
    pub fn program(&self) -> Option<&Program> {
        match &self.outcome {
            BatchOutcome::DraftProgram { program } => Some(program),
            BatchOutcome::Failure { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Failure { .. })
    }
}

/// One entry per submitted target, in submission order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| e.is_failure()).count()
    }

    /// Drafts that came back with at least one unfilled role
    pub fn flagged(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|e| e.program())
            .filter(|p| !p.unfilled.is_empty())
            .count()
    }
}

/// Ledger snapshot plus assignments drafted earlier in the same batch
struct BatchHistory<'a> {
    base: &'a LedgerSnapshot,
    provisional: HashMap<PersonId, HashMap<String, NaiveDate>>,
}

impl<'a> BatchHistory<'a> {
    fn new(base: &'a LedgerSnapshot) -> Self {
        Self {
            base,
            provisional: HashMap::new(),
        }
    }

    fn note(&mut self, program: &Program) {
        for assignment in &program.assignments {
            if let Some(person_id) = assignment.person_id {
                let latest = self
                    .provisional
                    .entry(person_id)
                    .or_default()
                    .entry(assignment.role.clone())
                    .or_insert(program.date);
                if program.date > *latest {
                    *latest = program.date;
                }
            }
        }
    }
}

impl ServiceHistory for BatchHistory<'_> {
    fn last_served(&self, person_id: PersonId, role: &str) -> Option<NaiveDate> {
        let drafted = self
            .provisional
            .get(&person_id)
            .and_then(|roles| roles.get(role))
            .copied();
        self.base.last_served(person_id, role).max(drafted)
    }
}

/// Drives the rotation scheduler over many targets and collects drafts for review
pub struct BatchOrchestrator {
    roster: Arc<Roster>,
    catalog: Arc<RoleCatalog>,
    ledger: Arc<RwLock<AssignmentLedger>>,
    repository: Arc<ProgramRepository>,
    workers: Arc<Semaphore>,
    snapshot_timeout: Duration,
}

impl BatchOrchestrator {
    pub fn new(
        roster: Arc<Roster>,
        catalog: Arc<RoleCatalog>,
        ledger: Arc<RwLock<AssignmentLedger>>,
        repository: Arc<ProgramRepository>,
        worker_count: usize,
        snapshot_timeout: Duration,
    ) -> Self {
        Self {
            roster,
            catalog,
            ledger,
            repository,
            workers: Arc::new(Semaphore::new(worker_count.max(1))),
            snapshot_timeout,
        }
    }

    pub async fn run(&self, targets: Vec<BatchTarget>) -> BatchResult {
        self.run_pending(targets.into_iter().map(PendingTarget::from).collect())
            .await
    }

    /// Generates a draft per target. A failing target never stops the others.
    pub async fn run_pending(&self, targets: Vec<PendingTarget>) -> BatchResult {
        tracing::info!(targets = targets.len(), "Starting batch generation");

        // One snapshot for the whole batch
        let snapshot = match tokio::time::timeout(self.snapshot_timeout, self.ledger.read()).await
        {
            Ok(ledger) => ledger.snapshot(),
            Err(_) => {
                tracing::warn!("Timed out waiting for ledger snapshot");
                let err = SchedulerError::Timeout("ledger snapshot".to_string());
                return BatchResult {
                    entries: targets
                        .into_iter()
                        .map(|t| failure_entry(t.date, t.activity_type_id, &err))
                        .collect(),
                };
            }
        };

        // Only pool building runs on the worker pool; selection below stays sequential,
        // in submission order
        let handles: Vec<Option<JoinHandle<Result<PreparedTarget>>>> = targets
            .iter()
            .map(|pending| {
                let target = pending.parsed.as_ref().ok()?.clone();
                let roster = Arc::clone(&self.roster);
                let catalog = Arc::clone(&self.catalog);
                let workers = Arc::clone(&self.workers);
                Some(tokio::spawn(async move {
                    let _permit = workers.acquire_owned().await.ok();
                    rotation::prepare(target.date, &target.activity_type_id, &roster, &catalog)
                }))
            })
            .collect();
        let prepared = join_all(handles.into_iter().map(|handle| async move {
            match handle {
                Some(handle) => Some(handle.await),
                None => None,
            }
        }))
        .await;

        // Selection runs in submission order so earlier drafts feed later rankings
        let mut history = BatchHistory::new(&snapshot);
        let mut entries = Vec::with_capacity(targets.len());
        for (pending, prepared) in targets.into_iter().zip(prepared) {
            let PendingTarget {
                date,
                activity_type_id,
                parsed,
            } = pending;

            let prepared = match (parsed, prepared) {
                (Err(err), _) => {
                    entries.push(failure_entry(date, activity_type_id, &err));
                    continue;
                }
                (Ok(_), Some(Ok(Ok(prepared)))) => prepared,
                (Ok(_), Some(Ok(Err(err)))) => {
                    entries.push(failure_entry(date, activity_type_id, &err));
                    continue;
                }
                (Ok(_), Some(Err(join_err))) => {
                    tracing::error!(date = %date, error = %join_err, "Batch worker failed");
                    let err = SchedulerError::InvalidState(format!("worker failed: {join_err}"));
                    entries.push(failure_entry(date, activity_type_id, &err));
                    continue;
                }
                (Ok(_), None) => {
                    let err = SchedulerError::InvalidState("target was not prepared".to_string());
                    entries.push(failure_entry(date, activity_type_id, &err));
                    continue;
                }
            };

            let draft = match catch_unwind(AssertUnwindSafe(|| rotation::select(&prepared, &history)))
            {
                Ok(draft) => draft,
                Err(_) => {
                    tracing::error!(date = %date, "Selection panicked");
                    let err = SchedulerError::InvalidState("selection panicked".to_string());
                    entries.push(failure_entry(date, activity_type_id, &err));
                    continue;
                }
            };

            let program = self.repository.save_draft(draft).await;
            history.note(&program);
            entries.push(BatchEntry {
                date,
                activity_type_id,
                outcome: BatchOutcome::DraftProgram { program },
            });
        }

        let result = BatchResult { entries };
        tracing::info!(
            targets = result.len(),
            failures = result.failures(),
            flagged = result.flagged(),
            "Batch generation finished"
        );
        result
    }
}

fn failure_entry(date: String, activity_type_id: String, err: &SchedulerError) -> BatchEntry {
    tracing::warn!(date = %date, activity_type_id = %activity_type_id, error = %err, "Batch target failed");
    BatchEntry {
        date,
        activity_type_id,
        outcome: BatchOutcome::Failure {
            kind: err.kind(),
            reason: err.to_string(),
        },
    }
}
