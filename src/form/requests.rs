use serde::Deserialize;

use crate::error::{Result, SchedulerError};
use crate::schedule::batch::PendingTarget;
use crate::schedule::date_utils::{expand_date_range, parse_date, parse_weekday, MAX_BATCH_DATES};
use crate::schedule::types::{BatchTarget, PersonId};

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SchedulerError::config(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Single-date generation
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub activity_type_id: String,
    pub date: String,
}

impl GenerateRequest {
    pub fn validate(&self) -> Result<BatchTarget> {
        Ok(BatchTarget {
            activity_type_id: required("activity_type_id", &self.activity_type_id)?,
            date: parse_date(&self.date)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetRequest {
    pub date: String,
    pub activity_type_id: String,
}

/// Every matching weekday between `from` and `to`, inclusive, for one activity
#[derive(Debug, Clone, Deserialize)]
pub struct DateRangeRequest {
    pub activity_type_id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub weekdays: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub targets: Vec<TargetRequest>,
    #[serde(default)]
    pub range: Option<DateRangeRequest>,
}

impl BatchRequest {
    /// Explicit targets first, then the expanded range.
    ///
    /// A malformed explicit target becomes a failed entry at its position; only
    /// a malformed range or an empty/oversized batch rejects the whole request.
    pub fn into_pending(self) -> Result<Vec<PendingTarget>> {
        let mut pending: Vec<PendingTarget> = self
            .targets
            .into_iter()
            .map(|t| {
                let parsed = GenerateRequest {
                    activity_type_id: t.activity_type_id.clone(),
                    date: t.date.clone(),
                }
                .validate();
                PendingTarget {
                    date: t.date,
                    activity_type_id: t.activity_type_id,
                    parsed,
                }
            })
            .collect();

        if let Some(range) = self.range {
            let activity_type_id = required("range.activity_type_id", &range.activity_type_id)?;
            let from = parse_date(&range.from)?;
            let to = parse_date(&range.to)?;
            let weekdays = range
                .weekdays
                .iter()
                .map(|w| {
                    parse_weekday(w)
                        .ok_or_else(|| SchedulerError::config(format!("invalid weekday: {w:?}")))
                })
                .collect::<Result<Vec<_>>>()?;
            for date in expand_date_range(from, to, &weekdays)? {
                pending.push(PendingTarget::from(BatchTarget {
                    date,
                    activity_type_id: activity_type_id.clone(),
                }));
            }
        }

        if pending.is_empty() {
            return Err(SchedulerError::config("batch has no targets"));
        }
        if pending.len() > MAX_BATCH_DATES {
            return Err(SchedulerError::config(format!(
                "batch has {} targets; the limit is {MAX_BATCH_DATES}",
                pending.len()
            )));
        }
        Ok(pending)
    }
}

/// Manual pick for one slot; `person_id: null` clears it
#[derive(Debug, Clone, Deserialize)]
pub struct ReassignRequest {
    pub role: String,
    #[serde(default)]
    pub slot: u32,
    pub person_id: Option<PersonId>,
}

impl ReassignRequest {
    pub fn validate(&self) -> Result<String> {
        required("role", &self.role)
    }
}

/// "Assign at random" for one role, or every role when `role` is absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RandomizeRequest {
    #[serde(default)]
    pub role: Option<String>,
    /// Fixes the shuffle, mainly for reproducing a result
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RandomizeRequest {
    pub fn validate(&self) -> Result<Option<String>> {
        self.role.as_deref().map(|r| required("role", r)).transpose()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartitionRequest {
    pub group_count: i64,
    /// Keep existing group identity instead of dealing from scratch
    #[serde(default)]
    pub rebalance: bool,
}

impl PartitionRequest {
    pub fn validate(&self) -> Result<usize> {
        if self.group_count <= 0 {
            return Err(SchedulerError::config(format!(
                "group count must be positive, got {}",
                self.group_count
            )));
        }
        usize::try_from(self.group_count)
            .map_err(|_| SchedulerError::config("group count is too large"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextTurnRequest {
    pub date: String,
}

impl NextTurnRequest {
    pub fn validate(&self) -> Result<chrono::NaiveDate> {
        parse_date(&self.date)
    }
}
