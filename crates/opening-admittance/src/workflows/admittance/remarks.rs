use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use super::identity::Person;

/// Advisory annotation attached to a person for manual review.
///
/// Remarks never change an allocation; only confirmed duplicates do that, and
/// they are recorded here as well so the report explains the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Remark {
    Banned,
    ConfirmedBan {
        matched: Person,
    },
    SuspectedBan {
        matched: Person,
    },
    SuspiciousEmail {
        ending: String,
    },
    /// `None` means excluded from every timeslot.
    DownPrioritized {
        timeslot: Option<String>,
    },
    ConfirmedDownPrioritized {
        timeslot: String,
        matched: Person,
    },
    SuspectedDownPrioritized {
        timeslot: String,
        matched: Person,
    },
    Resubmitted {
        previous_timestamp: NaiveDateTime,
        timestamp: NaiveDateTime,
        previous_timeslots: Vec<String>,
        timeslots: Vec<String>,
    },
    SupersededByDuplicate {
        duplicate: Person,
    },
    ReplacedDuplicate {
        original: Person,
    },
    SuspectedDuplicate {
        other: Person,
    },
    PossibleCancellation {
        cancelled: Person,
    },
    PossibleBan {
        banned: Person,
    },
}

impl Remark {
    pub fn summary(&self) -> String {
        match self {
            Remark::Banned => "banned from attending, see ban list".to_string(),
            Remark::ConfirmedBan { matched } => {
                format!("confirmed ban, same person as {matched} from the ban list")
            }
            Remark::SuspectedBan { matched } => {
                format!("suspected ban, might be {matched} from the ban list")
            }
            Remark::SuspiciousEmail { ending } => {
                format!("likely a non-working email, it ends with '{ending}'")
            }
            Remark::DownPrioritized { timeslot: None } => {
                "down prioritised from every timeslot after attending an earlier opening"
                    .to_string()
            }
            Remark::DownPrioritized {
                timeslot: Some(timeslot),
            } => format!("down prioritised from {timeslot} after attending an earlier opening"),
            Remark::ConfirmedDownPrioritized { timeslot, matched } => format!(
                "down prioritised from {timeslot}, confirmed duplicate of {matched} from the down prioritised list"
            ),
            Remark::SuspectedDownPrioritized { timeslot, matched } => format!(
                "subject to down prioritisation from {timeslot}, might be {matched} from the down prioritised list"
            ),
            Remark::Resubmitted {
                previous_timestamp,
                timestamp,
                previous_timeslots,
                timeslots,
            } => format!(
                "resubmitted with new timeslots: timestamp changed from {previous_timestamp} to {timestamp}, timeslots changed from [{}] to [{}]",
                previous_timeslots.join(", "),
                timeslots.join(", ")
            ),
            Remark::SupersededByDuplicate { duplicate } => {
                format!("confirmed duplicate, registration superseded by {duplicate}")
            }
            Remark::ReplacedDuplicate { original } => {
                format!("confirmed duplicate of {original}, replaced their earlier registration")
            }
            Remark::SuspectedDuplicate { other } => format!("suspected duplicate of {other}"),
            Remark::PossibleCancellation { cancelled } => {
                format!("might have cancelled, {cancelled} cancelled and might be the same person")
            }
            Remark::PossibleBan { banned } => {
                format!("might have been banned, {banned} is banned and might be the same person")
            }
        }
    }
}

/// Remarks per person, in the order people were first remarked and the order
/// remarks were recorded.
#[derive(Debug, Clone, Default)]
pub struct RemarkLog {
    entries: IndexMap<Person, Vec<Remark>>,
}

impl RemarkLog {
    pub fn record(&mut self, person: &Person, remark: Remark) {
        debug!(%person, remark = %remark.summary(), "remark recorded");
        self.entries.entry(person.clone()).or_default().push(remark);
    }

    pub fn for_person(&self, person: &Person) -> &[Remark] {
        self.entries.get(person).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn summaries_for(&self, person: &Person) -> Vec<String> {
        self.for_person(person).iter().map(Remark::summary).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Person, &[Remark])> {
        self.entries
            .iter()
            .map(|(person, remarks)| (person, remarks.as_slice()))
    }

    /// Number of remarked people.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
