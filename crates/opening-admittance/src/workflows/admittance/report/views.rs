use chrono::NaiveDateTime;
use serde::Serialize;

use super::super::domain::{Placement, RegistrationExtras};
use super::super::identity::Person;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonView {
    pub name: String,
    pub email: String,
}

impl From<&Person> for PersonView {
    fn from(person: &Person) -> Self {
        Self {
            name: person.name().to_string(),
            email: person.email().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationView {
    pub name: String,
    pub email: String,
    pub timestamp: NaiveDateTime,
    pub timeslots: Vec<String>,
    pub extras: RegistrationExtras,
    pub remarks: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeslotRosterView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    pub spots_taken: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spots_available: Option<usize>,
    /// Admission order.
    pub admitted: Vec<RegistrationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemarkedPersonView {
    pub name: String,
    pub email: String,
    pub placement: Placement,
    pub placement_label: &'static str,
    pub remarks: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub admitted: usize,
    pub waiting: usize,
    pub cancelled: usize,
    pub banned: usize,
    pub remarked: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpeningReport {
    pub totals: ReportTotals,
    pub timeslots: Vec<TimeslotRosterView>,
    pub waiting_list: Vec<RegistrationView>,
    pub cancelled: Vec<PersonView>,
    pub banned: Vec<PersonView>,
    pub remarked: Vec<RemarkedPersonView>,
}
