use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use super::types::{Person, PersonId};
use crate::error::{Result, SchedulerError};

/// Read-only snapshot of the membership, ordered by person id
#[derive(Debug, Clone, Default)]
pub struct Roster {
    people: Vec<Person>,
    index: HashMap<PersonId, usize>,
}

impl Roster {
    pub fn new(mut people: Vec<Person>) -> Result<Self> {
        people.sort_by_key(|p| p.id);
        let mut index = HashMap::with_capacity(people.len());
        for (pos, person) in people.iter().enumerate() {
            if index.insert(person.id, pos).is_some() {
                return Err(SchedulerError::config(format!(
                    "roster lists person {} more than once",
                    person.id
                )));
            }
        }
        Ok(Self { people, index })
    }

    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.index.get(&id).map(|&pos| &self.people[pos])
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// True when no blackout or weekly exclusion covers `date`
    pub fn is_available(person: &Person, date: NaiveDate) -> bool {
        !person.weekly_exclusions.contains(&date.weekday())
            && !person.blackouts.iter().any(|b| b.covers(date))
    }

    /// Active people qualified for `role` and available on `date`, in id order
    pub fn qualified(&self, role: &str, date: NaiveDate) -> Vec<&Person> {
        self.people
            .iter()
            .filter(|p| p.active && p.qualified_for(role, date) && Self::is_available(p, date))
            .collect()
    }

    /// Members taking part in rotating work groups, in id order
    pub fn group_members(&self) -> Vec<PersonId> {
        self.people
            .iter()
            .filter(|p| p.active && p.group_eligible)
            .map(|p| p.id)
            .collect()
    }
}
