use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("A published program already exists for {activity_type_id} on {date}")]
    DuplicateTarget {
        activity_type_id: String,
        date: NaiveDate,
    },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Program not found: {0}")]
    ProgramNotFound(Uuid),

    #[error("Person not found: {0}")]
    PersonNotFound(u64),

    #[error("Person {person_id} is already assigned to {role} in this program")]
    DuplicatePerson { person_id: u64, role: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error category surfaced in batch outcomes and HTTP bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    DuplicateTarget,
    Timeout,
    NotFound,
    InvalidState,
}

impl SchedulerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulerError::Configuration(_)
            | SchedulerError::Csv(_)
            | SchedulerError::Json(_) => ErrorKind::Configuration,
            SchedulerError::DuplicateTarget { .. } => ErrorKind::DuplicateTarget,
            SchedulerError::Timeout(_) => ErrorKind::Timeout,
            SchedulerError::ProgramNotFound(_) | SchedulerError::PersonNotFound(_) => {
                ErrorKind::NotFound
            }
            SchedulerError::DuplicatePerson { .. }
            | SchedulerError::InvalidState(_)
            | SchedulerError::Io(_) => ErrorKind::InvalidState,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        SchedulerError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
