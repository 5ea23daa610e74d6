use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::error::{Result, SchedulerError};
use crate::schedule::ledger::AssignmentLedger;
use crate::schedule::types::{DraftProgram, PersonId, Program, ProgramStatus, TargetKey};

/// Exclusive commit locks, one per (activity type, date) while someone uses it
#[derive(Debug, Default)]
struct LockTable {
    locks: StdMutex<HashMap<TargetKey, Arc<Mutex<()>>>>,
}

/// Holds a key's commit lock; the table entry goes away with the last holder
struct CommitGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _lease: KeyLease<'a>,
}

/// A handle on a table entry that prunes the entry when nobody else needs it
struct KeyLease<'a> {
    table: &'a LockTable,
    key: TargetKey,
    lock: Option<Arc<Mutex<()>>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        self.table.prune(&self.key);
    }
}

impl LockTable {
    fn table(&self) -> MutexGuard<'_, HashMap<TargetKey, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, key: &TargetKey, wait: Duration) -> Result<CommitGuard<'_>> {
        let lock = {
            let mut locks = self.table();
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let lease = KeyLease {
            table: self,
            key: key.clone(),
            lock: Some(Arc::clone(&lock)),
        };

        let acquired = tokio::time::timeout(wait, lock.lock_owned()).await;
        match acquired {
            Ok(guard) => Ok(CommitGuard {
                _guard: guard,
                _lease: lease,
            }),
            Err(_) => Err(SchedulerError::Timeout(format!(
                "commit lock for {} on {}",
                key.activity_type_id, key.date
            ))),
        }
    }

    /// Drops the entry once the table holds the only reference.
    /// With a count of 1 nobody else has a handle to clone from.
    fn prune(&self, key: &TargetKey) {
        let mut locks = self.table();
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

/// Stores drafts and published programs; the only writer of committed state
#[derive(Debug)]
pub struct ProgramRepository {
    programs: RwLock<HashMap<Uuid, Program>>,
    published: RwLock<HashMap<TargetKey, Uuid>>,
    commit_locks: LockTable,
    ledger: Arc<RwLock<AssignmentLedger>>,
    lock_timeout: Duration,
}

impl ProgramRepository {
    pub fn new(ledger: Arc<RwLock<AssignmentLedger>>, lock_timeout: Duration) -> Self {
        Self {
            programs: RwLock::new(HashMap::new()),
            published: RwLock::new(HashMap::new()),
            commit_locks: LockTable::default(),
            ledger,
            lock_timeout,
        }
    }

    pub async fn save_draft(&self, draft: DraftProgram) -> Program {
        let program = Program::from_draft(draft);
        tracing::debug!(
            program_id = %program.id,
            activity_type_id = %program.activity_type_id,
            date = %program.date,
            "Saved draft program"
        );
        self.programs
            .write()
            .await
            .insert(program.id, program.clone());
        program
    }

    pub async fn get(&self, id: Uuid) -> Result<Program> {
        self.programs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SchedulerError::ProgramNotFound(id))
    }

    /// All programs ordered by date, activity and creation time
    pub async fn list(&self) -> Vec<Program> {
        let mut programs: Vec<Program> = self.programs.read().await.values().cloned().collect();
        programs.sort_by(|a, b| {
            (a.date, &a.activity_type_id, a.created_at).cmp(&(b.date, &b.activity_type_id, b.created_at))
        });
        programs
    }

    pub async fn drafts_for(&self, activity_type_id: &str, date: NaiveDate) -> Vec<Program> {
        self.list()
            .await
            .into_iter()
            .filter(|p| {
                p.status == ProgramStatus::Draft
                    && p.activity_type_id == activity_type_id
                    && p.date == date
            })
            .collect()
    }

    pub async fn published_for(&self, activity_type_id: &str, date: NaiveDate) -> Option<Program> {
        let id = *self
            .published
            .read()
            .await
            .get(&TargetKey::new(activity_type_id, date))?;
        self.programs.read().await.get(&id).cloned()
    }

    /// Applies a manual edit to a stored program
    pub async fn update<F>(&self, id: Uuid, edit: F) -> Result<Program>
    where
        F: FnOnce(&mut Program) -> Result<()>,
    {
        let mut programs = self.programs.write().await;
        let program = programs
            .get_mut(&id)
            .ok_or(SchedulerError::ProgramNotFound(id))?;
        let mut edited = program.clone();
        edit(&mut edited)?;
        *program = edited.clone();
        Ok(edited)
    }

    /// Deletes a draft. Published programs must be cancelled instead.
    pub async fn discard(&self, id: Uuid) -> Result<()> {
        let mut programs = self.programs.write().await;
        let program = programs
            .get(&id)
            .ok_or(SchedulerError::ProgramNotFound(id))?;
        if program.status != ProgramStatus::Draft {
            return Err(SchedulerError::InvalidState(format!(
                "program {id} is {:?}; only drafts can be discarded",
                program.status
            )));
        }
        programs.remove(&id);
        tracing::info!(program_id = %id, "Discarded draft");
        Ok(())
    }

    /// Publishes a draft and appends its assignments to the ledger.
    ///
    /// Only one commit per (activity type, date) wins; later ones get
    /// `DuplicateTarget` and must regenerate against fresh state.
    pub async fn commit(&self, id: Uuid) -> Result<Program> {
        let key = self.get(id).await?.key();
        let _guard = self.commit_locks.acquire(&key, self.lock_timeout).await?;

        let mut programs = self.programs.write().await;
        let mut published = self.published.write().await;
        let program = programs
            .get_mut(&id)
            .ok_or(SchedulerError::ProgramNotFound(id))?;

        match program.status {
            ProgramStatus::Draft => {}
            ProgramStatus::Published => {
                return Err(SchedulerError::DuplicateTarget {
                    activity_type_id: key.activity_type_id,
                    date: key.date,
                })
            }
            ProgramStatus::Cancelled => {
                return Err(SchedulerError::InvalidState(format!(
                    "program {id} was cancelled"
                )))
            }
        }
        if published.contains_key(&key) {
            return Err(SchedulerError::DuplicateTarget {
                activity_type_id: key.activity_type_id,
                date: key.date,
            });
        }
        ensure_no_duplicates(program)?;

        let mut ledger = tokio::time::timeout(self.lock_timeout, self.ledger.write())
            .await
            .map_err(|_| SchedulerError::Timeout("ledger write".to_string()))?;
        program.status = ProgramStatus::Published;
        published.insert(key, id);
        ledger.record_commit(program);

        tracing::info!(
            program_id = %id,
            activity_type_id = %program.activity_type_id,
            date = %program.date,
            "Committed program"
        );
        Ok(program.clone())
    }

    /// Cancels a published program, freeing its target and appending tombstones
    pub async fn cancel(&self, id: Uuid) -> Result<Program> {
        let key = self.get(id).await?.key();
        let _guard = self.commit_locks.acquire(&key, self.lock_timeout).await?;

        let mut programs = self.programs.write().await;
        let mut published = self.published.write().await;
        let program = programs
            .get_mut(&id)
            .ok_or(SchedulerError::ProgramNotFound(id))?;
        if program.status != ProgramStatus::Published {
            return Err(SchedulerError::InvalidState(format!(
                "program {id} is {:?}; only published programs can be cancelled",
                program.status
            )));
        }

        let mut ledger = tokio::time::timeout(self.lock_timeout, self.ledger.write())
            .await
            .map_err(|_| SchedulerError::Timeout("ledger write".to_string()))?;
        program.status = ProgramStatus::Cancelled;
        published.remove(&key);
        ledger.record_cancellation(program);

        tracing::info!(program_id = %id, "Cancelled program");
        Ok(program.clone())
    }
}

fn ensure_no_duplicates(program: &Program) -> Result<()> {
    let mut seen: HashSet<PersonId> = HashSet::new();
    for assignment in &program.assignments {
        if let Some(person_id) = assignment.person_id {
            if !seen.insert(person_id) {
                return Err(SchedulerError::DuplicatePerson {
                    person_id,
                    role: assignment.role.clone(),
                });
            }
        }
    }
    Ok(())
}
