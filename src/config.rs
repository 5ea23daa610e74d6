use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SchedulerError};

/// Runtime settings for the scheduling service.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on concurrently prepared batch targets
    pub worker_count: usize,
    /// How long to wait for a consistent ledger snapshot
    pub snapshot_timeout_ms: u64,
    /// How long a commit waits for its (activity, date) lock
    pub lock_timeout_ms: u64,
    /// HTTP port for web mode
    pub port: u16,
    /// Roster CSV loaded at startup
    pub roster_path: Option<PathBuf>,
    /// Activity catalog JSON loaded at startup
    pub catalog_path: Option<PathBuf>,
    /// Past assignments CSV used to seed the ledger
    pub history_path: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            snapshot_timeout_ms: 2000,
            lock_timeout_ms: 2000,
            port: 8080,
            roster_path: None,
            catalog_path: None,
            history_path: None,
        }
    }
}

impl SchedulerConfig {
    /// Defaults overlaid with `ROTA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("ROTA_WORKERS") {
            cfg.worker_count = parse_var("ROTA_WORKERS", &v)?;
        }
        if let Some(v) = lookup("ROTA_SNAPSHOT_TIMEOUT_MS") {
            cfg.snapshot_timeout_ms = parse_var("ROTA_SNAPSHOT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("ROTA_LOCK_TIMEOUT_MS") {
            cfg.lock_timeout_ms = parse_var("ROTA_LOCK_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("ROTA_PORT") {
            cfg.port = parse_var("ROTA_PORT", &v)?;
        }
        cfg.roster_path = lookup("ROTA_ROSTER").map(PathBuf::from);
        cfg.catalog_path = lookup("ROTA_CATALOG").map(PathBuf::from);
        cfg.history_path = lookup("ROTA_HISTORY").map(PathBuf::from);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(SchedulerError::config("worker_count must be at least 1"));
        }
        if self.snapshot_timeout_ms == 0 || self.lock_timeout_ms == 0 {
            return Err(SchedulerError::config("timeouts must be non-zero"));
        }
        Ok(())
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SchedulerError::config(format!("{key} has an invalid value: {value:?}")))
}
