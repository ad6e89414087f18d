use super::super::domain::Registration;
use super::super::opening::Opening;
use super::views::{
    OpeningReport, PersonView, RegistrationView, RemarkedPersonView, ReportTotals,
    TimeslotRosterView,
};

impl OpeningReport {
    /// Read-only snapshot of a finished opening.
    pub fn from_opening(opening: &Opening) -> Self {
        let timeslots: Vec<TimeslotRosterView> = opening
            .timeslots()
            .iter()
            .map(|(name, slot)| TimeslotRosterView {
                name: name.clone(),
                capacity: slot.capacity(),
                spots_taken: slot.spots_taken(),
                spots_available: slot.spots_available(),
                admitted: slot
                    .spots()
                    .iter()
                    .filter_map(|person| opening.registration_for(person))
                    .map(|registration| registration_view(opening, registration))
                    .collect(),
            })
            .collect();

        let waiting_list: Vec<RegistrationView> = opening
            .waiting_list()
            .iter()
            .map(|registration| registration_view(opening, registration))
            .collect();

        let cancelled: Vec<PersonView> = opening.cancelled().iter().map(PersonView::from).collect();
        let banned: Vec<PersonView> = opening.banned().iter().map(PersonView::from).collect();

        let remarked: Vec<RemarkedPersonView> = opening
            .remarks()
            .iter()
            .map(|(person, remarks)| {
                let placement = opening.placement(person);
                RemarkedPersonView {
                    name: person.name().to_string(),
                    email: person.email().to_string(),
                    placement_label: placement.label(),
                    placement,
                    remarks: remarks.iter().map(|remark| remark.summary()).collect(),
                }
            })
            .collect();

        let totals = ReportTotals {
            admitted: timeslots.iter().map(|slot| slot.spots_taken).sum(),
            waiting: waiting_list.len(),
            cancelled: cancelled.len(),
            banned: banned.len(),
            remarked: remarked.len(),
        };

        Self {
            totals,
            timeslots,
            waiting_list,
            cancelled,
            banned,
            remarked,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn registration_view(opening: &Opening, registration: &Registration) -> RegistrationView {
    RegistrationView {
        name: registration.person.name().to_string(),
        email: registration.person.email().to_string(),
        timestamp: registration.timestamp,
        timeslots: registration.timeslots.clone(),
        extras: registration.extras.clone(),
        remarks: opening.remarks().summaries_for(&registration.person),
    }
}
