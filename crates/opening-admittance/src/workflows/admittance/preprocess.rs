//! Screening pass that turns the raw, chronologically sorted registration
//! stream into one canonical registration per person.
//!
//! Gates run in a fixed order for every registration: exact ban, fuzzy ban,
//! suspicious email, global down-prioritisation, per-slot down-prioritisation,
//! resubmission and finally fuzzy cross-person duplicates. Bans and
//! down-prioritisation come first so an excluded identity never holds a slot,
//! and exact resubmissions are settled before any fuzzy comparison.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};

use super::domain::{ConfirmedDuplicates, Registration};
use super::identity::{Person, SimilarityMatcher};
use super::remarks::{Remark, RemarkLog};
use super::timeslot::Timeslot;

/// Mutable eligibility inputs lent to a single preprocessing pass.
///
/// The only mutations are confirmed-duplicate promotions, each of which is
/// returned as a [`Promotion`] so the owner can audit or revert it.
pub struct Eligibility<'a> {
    pub banned: &'a mut IndexSet<Person>,
    pub timeslots: &'a mut IndexMap<String, Timeslot>,
    pub confirmed: &'a ConfirmedDuplicates,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    Banned { person: Person },
    Disallowed { timeslot: String, person: Person },
}

/// Common typo of `.com`.
pub const DEFAULT_SUSPICIOUS_EMAIL_ENDING: &str = ".con";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessPolicy {
    /// Lowercase email suffixes that usually mean a typo'd address.
    pub suspicious_email_endings: Vec<String>,
}

impl Default for PreprocessPolicy {
    fn default() -> Self {
        Self {
            suspicious_email_endings: vec![DEFAULT_SUSPICIOUS_EMAIL_ENDING.to_string()],
        }
    }
}

#[derive(Debug, Default)]
pub struct PreprocessOutcome {
    /// Canonical registrations in queue order.
    pub canonical: IndexMap<Person, Registration>,
    pub promotions: Vec<Promotion>,
    /// Registrations that contributed nothing to the result.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    matcher: SimilarityMatcher,
    policy: PreprocessPolicy,
}

impl Preprocessor {
    pub fn new(matcher: SimilarityMatcher, policy: PreprocessPolicy) -> Self {
        Self { matcher, policy }
    }

    pub fn matcher(&self) -> &SimilarityMatcher {
        &self.matcher
    }

    /// Screens `registrations`, which must already be sorted by timestamp.
    pub fn run<I>(
        &self,
        registrations: I,
        eligibility: &mut Eligibility<'_>,
        remarks: &mut RemarkLog,
    ) -> PreprocessOutcome
    where
        I: IntoIterator<Item = Registration>,
    {
        let mut outcome = PreprocessOutcome::default();
        let mut received = 0usize;

        for registration in registrations {
            received += 1;
            let person = registration.person.clone();

            if self.screen_bans(&person, eligibility, remarks, &mut outcome.promotions) {
                outcome.skipped += 1;
                continue;
            }

            self.flag_suspicious_email(&person, remarks);

            if excluded_everywhere(&person, eligibility.timeslots) {
                debug!(%person, "skipping registration excluded from every timeslot");
                remarks.record(&person, Remark::DownPrioritized { timeslot: None });
                outcome.skipped += 1;
                continue;
            }

            self.screen_down_prioritization(
                &registration,
                eligibility,
                remarks,
                &mut outcome.promotions,
            );

            if let Some(existing) = outcome.canonical.get(&person) {
                if existing.requests_same_timeslots(&registration) {
                    debug!(%person, "ignoring identical resubmission");
                    outcome.skipped += 1;
                    continue;
                }

                remarks.record(
                    &person,
                    Remark::Resubmitted {
                        previous_timestamp: existing.timestamp,
                        timestamp: registration.timestamp,
                        previous_timeslots: existing.timeslots.clone(),
                        timeslots: registration.timeslots.clone(),
                    },
                );
                // The changed entry queues at its new timestamp.
                outcome.canonical.shift_remove(&person);
            } else {
                self.resolve_cross_person(
                    &person,
                    eligibility.confirmed,
                    &mut outcome.canonical,
                    remarks,
                );
            }

            outcome.canonical.insert(person, registration);
        }

        info!(
            received,
            canonical = outcome.canonical.len(),
            skipped = outcome.skipped,
            promotions = outcome.promotions.len(),
            "registrations preprocessed"
        );

        outcome
    }

    /// Returns true when the registration must be skipped.
    fn screen_bans(
        &self,
        person: &Person,
        eligibility: &mut Eligibility<'_>,
        remarks: &mut RemarkLog,
        promotions: &mut Vec<Promotion>,
    ) -> bool {
        if eligibility.banned.contains(person) {
            debug!(%person, "skipping banned registrant");
            remarks.record(person, Remark::Banned);
            return true;
        }

        let similar: Vec<Person> = eligibility
            .banned
            .iter()
            .filter(|banned| self.matcher.similar(person, banned))
            .cloned()
            .collect();

        if let Some(matched) = similar
            .iter()
            .find(|banned| eligibility.confirmed.confirms(person, banned))
        {
            warn!(%person, %matched, "confirmed duplicate of a banned person added to the ban list");
            eligibility.banned.insert(person.clone());
            promotions.push(Promotion::Banned {
                person: person.clone(),
            });
            remarks.record(
                person,
                Remark::ConfirmedBan {
                    matched: matched.clone(),
                },
            );
            return true;
        }

        if let Some(matched) = similar.into_iter().next() {
            remarks.record(person, Remark::SuspectedBan { matched });
        }

        false
    }

    /// Recorded once per person and ending, so resubmissions add nothing.
    fn flag_suspicious_email(&self, person: &Person, remarks: &mut RemarkLog) {
        for ending in &self.policy.suspicious_email_endings {
            if !person.email().ends_with(ending.as_str()) {
                continue;
            }
            let remark = Remark::SuspiciousEmail {
                ending: ending.clone(),
            };
            if !remarks.for_person(person).contains(&remark) {
                remarks.record(person, remark);
            }
        }
    }

    /// Marks (and for confirmed duplicates, extends) the disallowed sets of the
    /// requested slots. Never skips the registration: allocation itself refuses
    /// disallowed people.
    fn screen_down_prioritization(
        &self,
        registration: &Registration,
        eligibility: &mut Eligibility<'_>,
        remarks: &mut RemarkLog,
        promotions: &mut Vec<Promotion>,
    ) {
        let person = &registration.person;
        let requested = registration.requested_set();
        let confirmed = eligibility.confirmed;

        for (name, slot) in eligibility.timeslots.iter_mut() {
            if !requested.contains(name.as_str()) {
                continue;
            }

            if slot.is_disallowed(person) {
                remarks.record(
                    person,
                    Remark::DownPrioritized {
                        timeslot: Some(name.clone()),
                    },
                );
                break;
            }

            let mut similar: Vec<Person> = slot
                .disallowed()
                .iter()
                .filter(|disallowed| self.matcher.similar(person, disallowed))
                .cloned()
                .collect();
            similar.sort();

            let Some(first) = similar.first().cloned() else {
                continue;
            };

            match similar
                .into_iter()
                .find(|disallowed| confirmed.confirms(person, disallowed))
            {
                Some(matched) => {
                    warn!(%person, %matched, timeslot = %name, "confirmed duplicate added to disallowed list");
                    slot.disallow(person.clone());
                    promotions.push(Promotion::Disallowed {
                        timeslot: name.clone(),
                        person: person.clone(),
                    });
                    remarks.record(
                        person,
                        Remark::ConfirmedDownPrioritized {
                            timeslot: name.clone(),
                            matched,
                        },
                    );
                }
                None => remarks.record(
                    person,
                    Remark::SuspectedDownPrioritized {
                        timeslot: name.clone(),
                        matched: first,
                    },
                ),
            }
        }
    }

    /// Compares a first-time person against every canonical entry, one pair at
    /// a time.
    fn resolve_cross_person(
        &self,
        person: &Person,
        confirmed: &ConfirmedDuplicates,
        canonical: &mut IndexMap<Person, Registration>,
        remarks: &mut RemarkLog,
    ) {
        let similar: Vec<Person> = canonical
            .keys()
            .filter(|earlier| self.matcher.similar(person, earlier))
            .cloned()
            .collect();

        for earlier in similar {
            if confirmed.confirms(person, &earlier) {
                info!(%person, original = %earlier, "confirmed duplicate replaces earlier registration");
                canonical.shift_remove(&earlier);
                remarks.record(
                    &earlier,
                    Remark::SupersededByDuplicate {
                        duplicate: person.clone(),
                    },
                );
                remarks.record(person, Remark::ReplacedDuplicate { original: earlier });
            } else {
                remarks.record(
                    &earlier,
                    Remark::SuspectedDuplicate {
                        other: person.clone(),
                    },
                );
                remarks.record(person, Remark::SuspectedDuplicate { other: earlier });
            }
        }
    }
}

fn excluded_everywhere(person: &Person, timeslots: &IndexMap<String, Timeslot>) -> bool {
    !timeslots.is_empty() && timeslots.values().all(|slot| slot.is_disallowed(person))
}
