use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{ConfirmedDuplicates, Placement, Registration};
use super::identity::{Person, SimilarityMatcher};
use super::preprocess::{Eligibility, Preprocessor, Promotion};
use super::remarks::{Remark, RemarkLog};
use super::timeslot::{normalize_timeslot_name, Timeslot, TimeslotSpec};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OpeningError {
    #[error("timeslot '{0}' is defined more than once")]
    DuplicateTimeslot(String),
    #[error("unknown timeslot '{0}'")]
    UnknownTimeslot(String),
}

/// Counts produced by one [`Opening::auto_admit`] batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionSummary {
    pub canonical: usize,
    pub admitted: usize,
    pub waiting: usize,
    pub skipped: usize,
    /// Canonical people who already held a placement from an earlier batch.
    pub already_placed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum RemovalOutcome {
    Removed { previous: Placement },
    NotFound,
}

impl RemovalOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, RemovalOutcome::Removed { .. })
    }
}

/// Aggregate root for one opening: timeslots, eligibility inputs, allocation
/// results and the advisory remark log.
///
/// Every person has at most one [`Placement`]; rosters and the waiting list
/// are only mutated together with it.
#[derive(Debug, Default)]
pub struct Opening {
    timeslots: IndexMap<String, Timeslot>,
    banned: IndexSet<Person>,
    confirmed_duplicates: ConfirmedDuplicates,
    cancelled: IndexSet<Person>,
    waiting_list: Vec<Registration>,
    processed: IndexMap<Person, Registration>,
    placements: HashMap<Person, Placement>,
    remarks: RemarkLog,
    promotions: Vec<Promotion>,
    preprocessor: Preprocessor,
}

impl Opening {
    pub fn new<I, S>(timeslots: I) -> Result<Self, OpeningError>
    where
        I: IntoIterator<Item = (S, Timeslot)>,
        S: AsRef<str>,
    {
        let mut opening = Self::default();
        for (name, timeslot) in timeslots {
            let name = normalize_timeslot_name(name.as_ref());
            if opening.timeslots.contains_key(&name) {
                return Err(OpeningError::DuplicateTimeslot(name));
            }
            opening.timeslots.insert(name, timeslot);
        }
        Ok(opening)
    }

    pub fn from_specs(specs: &[TimeslotSpec]) -> Result<Self, OpeningError> {
        Self::new(
            specs
                .iter()
                .map(|spec| (spec.name.as_str(), Timeslot::with_capacity(spec.capacity))),
        )
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn ban_list<I>(&mut self, people: I)
    where
        I: IntoIterator<Item = Person>,
    {
        self.banned.extend(people);
    }

    pub fn confirm_duplicates(&mut self, confirmed: ConfirmedDuplicates) {
        self.confirmed_duplicates = confirmed;
    }

    pub fn disallow<I>(&mut self, timeslot: &str, people: I) -> Result<(), OpeningError>
    where
        I: IntoIterator<Item = Person>,
    {
        let name = normalize_timeslot_name(timeslot);
        let slot = self
            .timeslots
            .get_mut(&name)
            .ok_or(OpeningError::UnknownTimeslot(name))?;
        for person in people {
            slot.disallow(person);
        }
        Ok(())
    }

    pub fn matcher(&self) -> &SimilarityMatcher {
        self.preprocessor.matcher()
    }

    pub fn timeslots(&self) -> &IndexMap<String, Timeslot> {
        &self.timeslots
    }

    pub fn timeslot(&self, name: &str) -> Option<&Timeslot> {
        self.timeslots.get(name)
    }

    pub fn banned(&self) -> &IndexSet<Person> {
        &self.banned
    }

    pub fn cancelled(&self) -> &IndexSet<Person> {
        &self.cancelled
    }

    pub fn waiting_list(&self) -> &[Registration] {
        &self.waiting_list
    }

    /// Canonical registrations that went through allocation, in queue order.
    pub fn processed(&self) -> &IndexMap<Person, Registration> {
        &self.processed
    }

    pub fn registration_for(&self, person: &Person) -> Option<&Registration> {
        self.processed.get(person)
    }

    pub fn remarks(&self) -> &RemarkLog {
        &self.remarks
    }

    /// Ban and disallowed-list changes made since construction or the last reset.
    pub fn promotions(&self) -> &[Promotion] {
        &self.promotions
    }

    pub fn placement(&self, person: &Person) -> Placement {
        match self.placements.get(person) {
            Some(placement) => placement.clone(),
            None if self.banned.contains(person) => Placement::Banned,
            None => Placement::Unprocessed,
        }
    }

    /// Screens the batch and places every canonical registration into the
    /// first requested timeslot that accepts it, or onto the waiting list.
    /// Registrations must be sorted by timestamp.
    pub fn auto_admit<I>(&mut self, registrations: I) -> AdmissionSummary
    where
        I: IntoIterator<Item = Registration>,
    {
        let outcome = {
            let mut eligibility = Eligibility {
                banned: &mut self.banned,
                timeslots: &mut self.timeslots,
                confirmed: &self.confirmed_duplicates,
            };
            self.preprocessor
                .run(registrations, &mut eligibility, &mut self.remarks)
        };
        self.promotions.extend(outcome.promotions);

        let mut summary = AdmissionSummary {
            canonical: outcome.canonical.len(),
            skipped: outcome.skipped,
            ..AdmissionSummary::default()
        };

        for (person, registration) in outcome.canonical {
            if let Some(existing) = self.placements.get(&person) {
                debug!(%person, placement = existing.label(), "already placed in an earlier batch");
                summary.already_placed += 1;
                continue;
            }

            let placement = match self.place(&person, &registration) {
                Some(timeslot) => {
                    summary.admitted += 1;
                    Placement::Admitted { timeslot }
                }
                None => {
                    summary.waiting += 1;
                    self.waiting_list.push(registration.clone());
                    Placement::Waiting
                }
            };

            self.placements.insert(person.clone(), placement);
            self.processed.insert(person, registration);
        }

        info!(
            canonical = summary.canonical,
            admitted = summary.admitted,
            waiting = summary.waiting,
            skipped = summary.skipped,
            already_placed = summary.already_placed,
            "allocation finished"
        );

        summary
    }

    fn place(&mut self, person: &Person, registration: &Registration) -> Option<String> {
        registration
            .timeslots
            .iter()
            .find(|name| match self.timeslots.get_mut(name.as_str()) {
                Some(slot) => slot.admit(person.clone()),
                None => {
                    debug!(%person, timeslot = %name, "ignoring unknown timeslot");
                    false
                }
            })
            .cloned()
    }

    /// Removes the person from their timeslot or the waiting list and records
    /// them as cancelled. No one is promoted from the waiting list, and an
    /// unknown person leaves the opening untouched.
    pub fn cancel(&mut self, person: &Person) -> RemovalOutcome {
        self.remove_as(person, Placement::Cancelled)
    }

    /// Like [`Opening::cancel`] but moves the person to the banned set.
    pub fn ban(&mut self, person: &Person) -> RemovalOutcome {
        self.remove_as(person, Placement::Banned)
    }

    fn remove_as(&mut self, person: &Person, target: Placement) -> RemovalOutcome {
        let Some(previous) = self.detach(person) else {
            warn!(%person, action = target.label(), "person not found in any timeslot or the waiting list");
            return RemovalOutcome::NotFound;
        };

        self.flag_similar_neighbours(person, &target);

        match target {
            Placement::Banned => {
                if self.banned.insert(person.clone()) {
                    self.promotions.push(Promotion::Banned {
                        person: person.clone(),
                    });
                }
            }
            _ => {
                self.cancelled.insert(person.clone());
            }
        }

        info!(%person, from = previous.label(), to = target.label(), "person removed");
        self.placements.insert(person.clone(), target);
        RemovalOutcome::Removed { previous }
    }

    fn detach(&mut self, person: &Person) -> Option<Placement> {
        for (name, slot) in self.timeslots.iter_mut() {
            if slot.remove(person) {
                return Some(Placement::Admitted {
                    timeslot: name.clone(),
                });
            }
        }

        let index = self
            .waiting_list
            .iter()
            .position(|registration| &registration.person == person)?;
        self.waiting_list.remove(index);
        Some(Placement::Waiting)
    }

    /// People still holding a spot or a waiting-list entry who resemble the
    /// removed person get an advisory remark; they stay where they are.
    fn flag_similar_neighbours(&mut self, person: &Person, target: &Placement) {
        let matcher = *self.preprocessor.matcher();
        let neighbours: Vec<Person> = self
            .timeslots
            .values()
            .flat_map(|slot| slot.spots().iter())
            .chain(self.waiting_list.iter().map(|registration| &registration.person))
            .filter(|other| *other != person && matcher.similar(person, other))
            .cloned()
            .collect();

        for neighbour in neighbours {
            let remark = match target {
                Placement::Banned => Remark::PossibleBan {
                    banned: person.clone(),
                },
                _ => Remark::PossibleCancellation {
                    cancelled: person.clone(),
                },
            };
            self.remarks.record(&neighbour, remark);
        }
    }

    /// Clears allocation results and reverts every promotion and ban made
    /// since construction, restoring the seeded eligibility inputs.
    pub fn reset(&mut self) {
        for slot in self.timeslots.values_mut() {
            slot.clear();
        }

        for promotion in self.promotions.drain(..) {
            match promotion {
                Promotion::Banned { person } => {
                    self.banned.shift_remove(&person);
                }
                Promotion::Disallowed { timeslot, person } => {
                    if let Some(slot) = self.timeslots.get_mut(&timeslot) {
                        slot.allow(&person);
                    }
                }
            }
        }

        self.processed.clear();
        self.cancelled.clear();
        self.waiting_list.clear();
        self.placements.clear();
        self.remarks.clear();
        debug!("opening reset");
    }
}
