//! Rotation-aware assignment scheduling for recurring church-service programs.
//!
//! Fills each program's roles from a roster by fairness (longest since last
//! served, then priority, then id), rotates work groups, and runs batches of
//! dates into drafts that a human reviews before they are committed.

pub mod config;
pub mod display;
pub mod error;
pub mod form;
pub mod parser;
pub mod repository;
pub mod schedule;
pub mod service;
pub mod web;

pub use error::{ErrorKind, Result, SchedulerError};
