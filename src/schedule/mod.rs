pub mod types;
pub mod date_utils;
pub mod roster;
pub mod catalog;
pub mod ledger;
pub mod rotation;
pub mod groups;
pub mod manual;
pub mod batch;

pub use types::{
    ActivityType, Assignment, AssignmentRecord, AssignmentStrategy, BatchTarget, Blackout,
    CleaningGroup, DraftProgram, Person, PersonId, Program, ProgramStatus, Qualification,
    RoleRequirement, TargetKey, UnfilledRole,
};
pub use roster::Roster;
pub use catalog::RoleCatalog;
pub use ledger::{AssignmentLedger, LedgerEntry, LedgerSnapshot, ServiceHistory};
pub use rotation::assign;
pub use batch::{BatchEntry, BatchOrchestrator, BatchOutcome, BatchResult, PendingTarget};
