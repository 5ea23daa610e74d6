use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::form::{
    BatchRequest, GenerateRequest, NextTurnRequest, PartitionRequest, RandomizeRequest,
    ReassignRequest,
};
use crate::parser;
use crate::repository::ProgramRepository;
use crate::schedule::batch::{BatchOrchestrator, BatchResult};
use crate::schedule::ledger::{AssignmentLedger, LedgerSnapshot};
use crate::schedule::{groups, manual, rotation};
use crate::schedule::{CleaningGroup, Program, RoleCatalog, Roster};

/// Entry point for generation, review edits, commits and group rotation
#[derive(Debug)]
pub struct SchedulingService {
    config: SchedulerConfig,
    roster: RwLock<Arc<Roster>>,
    catalog: RwLock<Arc<RoleCatalog>>,
    ledger: Arc<RwLock<AssignmentLedger>>,
    repository: Arc<ProgramRepository>,
    groups: RwLock<Vec<CleaningGroup>>,
}

impl SchedulingService {
    pub fn new(
        config: SchedulerConfig,
        roster: Roster,
        catalog: RoleCatalog,
        ledger: AssignmentLedger,
    ) -> Self {
        let ledger = Arc::new(RwLock::new(ledger));
        let repository = Arc::new(ProgramRepository::new(
            Arc::clone(&ledger),
            config.lock_timeout(),
        ));
        Self {
            config,
            roster: RwLock::new(Arc::new(roster)),
            catalog: RwLock::new(Arc::new(catalog)),
            ledger,
            repository,
            groups: RwLock::new(Vec::new()),
        }
    }

    /// Builds the service from the files named in `config`; missing files mean empty state
    pub fn from_config(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let roster = match &config.roster_path {
            Some(path) => parser::load_roster(path)?,
            None => Roster::default(),
        };
        let catalog = match &config.catalog_path {
            Some(path) => parser::load_catalog(path)?,
            None => RoleCatalog::default(),
        };
        let mut ledger = AssignmentLedger::new();
        if let Some(path) = &config.history_path {
            for record in parser::load_history(path)? {
                ledger.record_served(record);
            }
        }
        Ok(Self::new(config, roster, catalog, ledger))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub async fn roster(&self) -> Arc<Roster> {
        Arc::clone(&*self.roster.read().await)
    }

    pub async fn catalog(&self) -> Arc<RoleCatalog> {
        Arc::clone(&*self.catalog.read().await)
    }

    pub async fn replace_roster(&self, roster: Roster) {
        tracing::info!(people = roster.len(), "Replacing roster snapshot");
        *self.roster.write().await = Arc::new(roster);
    }

    pub async fn replace_catalog(&self, catalog: RoleCatalog) {
        *self.catalog.write().await = Arc::new(catalog);
    }

    pub fn ledger(&self) -> Arc<RwLock<AssignmentLedger>> {
        Arc::clone(&self.ledger)
    }

    async fn snapshot(&self) -> Result<LedgerSnapshot> {
        tokio::time::timeout(self.config.snapshot_timeout(), self.ledger.read())
            .await
            .map(|ledger| ledger.snapshot())
            .map_err(|_| SchedulerError::Timeout("ledger snapshot".to_string()))
    }

    /// Deterministic draft for one date, stored for review
    pub async fn generate(&self, req: &GenerateRequest) -> Result<Program> {
        let target = req.validate()?;
        let roster = self.roster().await;
        let catalog = self.catalog().await;
        let snapshot = self.snapshot().await?;
        let draft = rotation::assign(
            target.date,
            &target.activity_type_id,
            &roster,
            &catalog,
            &snapshot,
        )?;
        Ok(self.repository.save_draft(draft).await)
    }

    pub async fn batch_generate(&self, req: BatchRequest) -> Result<BatchResult> {
        let pending = req.into_pending()?;
        let orchestrator = BatchOrchestrator::new(
            self.roster().await,
            self.catalog().await,
            Arc::clone(&self.ledger),
            Arc::clone(&self.repository),
            self.config.worker_count,
            self.config.snapshot_timeout(),
        );
        Ok(orchestrator.run_pending(pending).await)
    }

    pub async fn program(&self, id: Uuid) -> Result<Program> {
        self.repository.get(id).await
    }

    pub async fn programs(&self) -> Vec<Program> {
        self.repository.list().await
    }

    pub async fn commit(&self, id: Uuid) -> Result<Program> {
        self.repository.commit(id).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Program> {
        self.repository.cancel(id).await
    }

    pub async fn discard(&self, id: Uuid) -> Result<()> {
        self.repository.discard(id).await
    }

    pub async fn reassign(&self, id: Uuid, req: &ReassignRequest) -> Result<Program> {
        let role = req.validate()?;
        let roster = self.roster().await;
        self.repository
            .update(id, |program| {
                manual::reassign(program, &roster, &role, req.slot, req.person_id)
            })
            .await
    }

    pub async fn randomize(&self, id: Uuid, req: &RandomizeRequest) -> Result<Program> {
        let role = req.validate()?;
        let roster = self.roster().await;
        let mut rng = match req.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.repository
            .update(id, |program| {
                manual::randomize(program, &roster, role.as_deref(), &mut rng)
            })
            .await
    }

    /// Deals fresh groups, or rebalances the current ones when asked
    pub async fn partition_groups(&self, req: &PartitionRequest) -> Result<Vec<CleaningGroup>> {
        let group_count = req.validate()?;
        let roster = self.roster().await;
        let mut current = self.groups.write().await;

        let mut updated = if req.rebalance && !current.is_empty() {
            groups::repartition(&current, &roster, group_count)?
        } else {
            groups::partition(&roster, group_count)?
        };
        groups::sync_from_ledger(&mut updated, &*self.ledger.read().await);

        *current = updated.clone();
        Ok(updated)
    }

    /// Hands the duty to the next group and records the turn
    pub async fn next_group_turn(&self, req: &NextTurnRequest) -> Result<CleaningGroup> {
        let date = req.validate()?;
        let mut current = self.groups.write().await;
        if current.is_empty() {
            return Err(SchedulerError::config(
                "no groups yet; partition the roster first",
            ));
        }

        let mut ledger = tokio::time::timeout(self.config.lock_timeout(), self.ledger.write())
            .await
            .map_err(|_| SchedulerError::Timeout("ledger write".to_string()))?;
        let group = groups::take_turn(&mut current, date)?;
        ledger.record_group_turn(group.id, date, group.last_turn);

        tracing::info!(group_id = group.id, date = %date, turn = group.last_turn, "Group turn assigned");
        Ok(group)
    }

    pub async fn groups(&self) -> Vec<CleaningGroup> {
        self.groups.read().await.clone()
    }
}
