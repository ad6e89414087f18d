use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::identity::Person;
use super::timeslot::normalize_timeslot_name;

/// One submitted form entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub person: Person,
    pub timestamp: NaiveDateTime,
    /// Requested slots in the order the person listed them.
    pub timeslots: Vec<String>,
    pub extras: RegistrationExtras,
}

impl Registration {
    pub fn new<I, S>(person: Person, timestamp: NaiveDateTime, timeslots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let timeslots = timeslots
            .into_iter()
            .map(|slot| normalize_timeslot_name(slot.as_ref()))
            .filter(|slot| !slot.is_empty())
            .collect();

        Self {
            person,
            timestamp,
            timeslots,
            extras: RegistrationExtras::default(),
        }
    }

    pub fn with_extras(mut self, extras: RegistrationExtras) -> Self {
        self.extras = extras;
        self
    }

    pub fn requested_set(&self) -> BTreeSet<&str> {
        self.timeslots.iter().map(String::as_str).collect()
    }

    /// Order and repetition are ignored.
    pub fn requests_same_timeslots(&self, other: &Registration) -> bool {
        self.requested_set() == other.requested_set()
    }
}

/// Optional form answers carried through to the report untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationExtras {
    pub read_rules: Option<bool>,
    pub student_type: Option<String>,
    pub erasmus: Option<bool>,
    pub nationality: Option<String>,
    pub residency: Option<String>,
}

/// The single authoritative outcome held for a person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Placement {
    Admitted { timeslot: String },
    Waiting,
    Cancelled,
    Banned,
    Unprocessed,
}

impl Placement {
    pub fn label(&self) -> &'static str {
        match self {
            Placement::Admitted { .. } => "admitted",
            Placement::Waiting => "waiting",
            Placement::Cancelled => "cancelled",
            Placement::Banned => "banned",
            Placement::Unprocessed => "unprocessed",
        }
    }

    /// Admitted or waiting.
    pub fn is_placed(&self) -> bool {
        matches!(self, Placement::Admitted { .. } | Placement::Waiting)
    }
}

/// Identities verified out-of-band to belong to someone already registered.
///
/// A listed person is a confirmed duplicate of anyone they are similar to; a
/// listed pair confirms exactly those two identities, in either order.
#[derive(Debug, Clone, Default)]
pub struct ConfirmedDuplicates {
    people: HashSet<Person>,
    pairs: HashSet<(Person, Person)>,
}

impl ConfirmedDuplicates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirm_person(&mut self, person: Person) {
        self.people.insert(person);
    }

    pub fn confirm_pair(&mut self, a: Person, b: Person) {
        let pair = if a <= b { (a, b) } else { (b, a) };
        self.pairs.insert(pair);
    }

    pub fn confirms(&self, subject: &Person, counterpart: &Person) -> bool {
        if self.people.contains(subject) {
            return true;
        }
        let pair = if subject <= counterpart {
            (subject.clone(), counterpart.clone())
        } else {
            (counterpart.clone(), subject.clone())
        };
        self.pairs.contains(&pair)
    }

    pub fn len(&self) -> usize {
        self.people.len() + self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.pairs.is_empty()
    }
}

impl FromIterator<Person> for ConfirmedDuplicates {
    fn from_iter<T: IntoIterator<Item = Person>>(iter: T) -> Self {
        let mut confirmed = Self::new();
        for person in iter {
            confirmed.confirm_person(person);
        }
        confirmed
    }
}
