use metrics_exporter_prometheus::PrometheusHandle;
use opening_admittance::config::AdmittanceConfig;
use opening_admittance::error::AppError;
use opening_admittance::workflows::admittance::{
    ConfirmedDuplicates, Opening, Person, Preprocessor, RemovalOutcome, TimeslotSpec,
};
use opening_admittance::workflows::registrations::PeopleTable;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) admittance: Arc<AdmittanceConfig>,
}

/// Everything needed to seed an opening before the first batch.
#[derive(Debug, Default)]
pub(crate) struct OpeningInputs {
    pub(crate) timeslots: Vec<TimeslotSpec>,
    pub(crate) ban_list: PeopleTable,
    pub(crate) disallowed: Vec<(String, PeopleTable)>,
    pub(crate) confirmed: ConfirmedDuplicates,
}

pub(crate) fn build_opening(
    inputs: OpeningInputs,
    preprocessor: Preprocessor,
) -> Result<Opening, AppError> {
    let OpeningInputs {
        timeslots,
        ban_list,
        disallowed,
        confirmed,
    } = inputs;

    let mut opening = Opening::from_specs(&timeslots)?.with_preprocessor(preprocessor);
    opening.ban_list(ban_list);
    for (timeslot, people) in disallowed {
        opening.disallow(&timeslot, people)?;
    }
    opening.confirm_duplicates(confirmed);
    Ok(opening)
}

/// Result of applying one list of cancellations or late bans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct RemovalTally {
    pub(crate) removed: usize,
    /// Listed people who held neither a spot nor a waiting-list entry.
    pub(crate) not_found: Vec<Person>,
}

pub(crate) fn apply_removals<I>(
    opening: &mut Opening,
    people: I,
    remove: fn(&mut Opening, &Person) -> RemovalOutcome,
) -> RemovalTally
where
    I: IntoIterator<Item = Person>,
{
    let mut tally = RemovalTally::default();
    for person in people {
        if remove(opening, &person).is_removed() {
            tally.removed += 1;
        } else {
            tally.not_found.push(person);
        }
    }
    tally
}

/// `SLOT=PATH` pairing a timeslot with its disallowed-people table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DisallowedPath {
    pub(crate) timeslot: String,
    pub(crate) path: PathBuf,
}

pub(crate) fn parse_disallowed(raw: &str) -> Result<DisallowedPath, String> {
    let (timeslot, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=PATH, got '{raw}'"))?;
    let (timeslot, path) = (timeslot.trim(), path.trim());
    if timeslot.is_empty() || path.is_empty() {
        return Err(format!("expected SLOT=PATH, got '{raw}'"));
    }

    Ok(DisallowedPath {
        timeslot: timeslot.to_string(),
        path: PathBuf::from(path),
    })
}
