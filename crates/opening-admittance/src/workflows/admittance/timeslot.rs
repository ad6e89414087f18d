use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::identity::Person;

/// Capacity-bounded (or unbounded) roster for one opening timeslot.
///
/// Membership checks are exact; the similarity matcher is never consulted here.
#[derive(Debug, Clone, Default)]
pub struct Timeslot {
    capacity: Option<usize>,
    spots: Vec<Person>,
    disallowed: HashSet<Person>,
}

impl Timeslot {
    pub fn limited(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Admitted people in admission order.
    pub fn spots(&self) -> &[Person] {
        &self.spots
    }

    pub fn spots_taken(&self) -> usize {
        self.spots.len()
    }

    /// Remaining room; `None` when the slot is unbounded.
    pub fn spots_available(&self) -> Option<usize> {
        self.capacity
            .map(|capacity| capacity.saturating_sub(self.spots.len()))
    }

    pub fn is_full(&self) -> bool {
        self.spots_available() == Some(0)
    }

    pub fn contains(&self, person: &Person) -> bool {
        self.spots.contains(person)
    }

    pub fn disallowed(&self) -> &HashSet<Person> {
        &self.disallowed
    }

    pub fn is_disallowed(&self, person: &Person) -> bool {
        self.disallowed.contains(person)
    }

    /// Returns true when the person was not already disallowed.
    pub fn disallow(&mut self, person: Person) -> bool {
        self.disallowed.insert(person)
    }

    pub(crate) fn allow(&mut self, person: &Person) -> bool {
        self.disallowed.remove(person)
    }

    pub fn admit(&mut self, person: Person) -> bool {
        if self.is_disallowed(&person) || self.is_full() {
            return false;
        }
        self.spots.push(person);
        true
    }

    pub fn remove(&mut self, person: &Person) -> bool {
        match self.spots.iter().position(|spot| spot == person) {
            Some(index) => {
                self.spots.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.spots.clear();
    }
}

/// `NAME=CAPACITY` or bare `NAME` for an unbounded slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeslotSpec {
    pub name: String,
    #[serde(default)]
    pub capacity: Option<usize>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimeslotSpecError {
    #[error("timeslot name must not be empty in '{0}'")]
    EmptyName(String),
    #[error("timeslot capacity in '{spec}' must be a non-negative integer")]
    InvalidCapacity { spec: String },
}

impl FromStr for TimeslotSpec {
    type Err = TimeslotSpecError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (name, capacity) = match raw.rsplit_once('=') {
            Some((name, capacity)) => {
                let capacity = capacity.trim().parse::<usize>().map_err(|_| {
                    TimeslotSpecError::InvalidCapacity {
                        spec: raw.to_string(),
                    }
                })?;
                (name, Some(capacity))
            }
            None => (raw, None),
        };

        let name = normalize_timeslot_name(name);
        if name.is_empty() {
            return Err(TimeslotSpecError::EmptyName(raw.to_string()));
        }

        Ok(Self { name, capacity })
    }
}

impl fmt::Display for TimeslotSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capacity {
            Some(capacity) => write!(f, "{}={}", self.name, capacity),
            None => f.write_str(&self.name),
        }
    }
}

/// Form answers like `"10:00 - 11:00"` and configured `"10:00-11:00"` refer to
/// the same slot, so spaces are dropped from timeslot names.
pub fn normalize_timeslot_name(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}
