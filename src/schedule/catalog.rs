use std::collections::{BTreeMap, HashSet};

use super::types::{ActivityType, RoleRequirement};
use crate::error::{Result, SchedulerError};

/// Activity type id -> required roles, validated on construction
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    activities: BTreeMap<String, ActivityType>,
}

impl RoleCatalog {
    pub fn new(activities: Vec<ActivityType>) -> Result<Self> {
        let mut catalog = Self::default();
        for activity in activities {
            catalog.insert(activity)?;
        }
        Ok(catalog)
    }

    /// Adds or replaces an activity type. Roles are stored in display order.
    pub fn insert(&mut self, mut activity: ActivityType) -> Result<()> {
        validate_activity(&activity)?;
        activity.roles.sort_by_key(|r| r.display_order);
        self.activities.insert(activity.id.clone(), activity);
        Ok(())
    }

    pub fn resolve(&self, activity_type_id: &str) -> Result<&ActivityType> {
        self.activities.get(activity_type_id).ok_or_else(|| {
            SchedulerError::config(format!("unknown activity type: {activity_type_id}"))
        })
    }

    /// Required roles for an activity, in display order
    pub fn roles(&self, activity_type_id: &str) -> Result<&[RoleRequirement]> {
        Ok(&self.resolve(activity_type_id)?.roles)
    }

    pub fn activities(&self) -> impl Iterator<Item = &ActivityType> {
        self.activities.values()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

fn validate_activity(activity: &ActivityType) -> Result<()> {
    if activity.id.trim().is_empty() {
        return Err(SchedulerError::config("activity type id is required"));
    }
    if activity.roles.is_empty() {
        return Err(SchedulerError::config(format!(
            "activity type {} defines no roles",
            activity.id
        )));
    }
    let mut seen = HashSet::new();
    for req in &activity.roles {
        if req.role.trim().is_empty() {
            return Err(SchedulerError::config(format!(
                "activity type {} has a role without a name",
                activity.id
            )));
        }
        if req.count == 0 {
            return Err(SchedulerError::config(format!(
                "role {} of {} requires zero people",
                req.role, activity.id
            )));
        }
        if !seen.insert(req.role.as_str()) {
            return Err(SchedulerError::config(format!(
                "role {} is listed twice in {}",
                req.role, activity.id
            )));
        }
    }
    Ok(())
}
