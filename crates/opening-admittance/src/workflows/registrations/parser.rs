use chrono::NaiveDateTime;
use csv::StringRecord;
use std::io::Read;

use super::RegistrationImportError;
use crate::workflows::admittance::{Person, Registration, RegistrationExtras};

const TIMESTAMP: usize = 0;
const EMAIL: usize = 1;
const NAME: usize = 2;
const TIMESLOTS: usize = 3;
const READ_RULES: usize = 4;
const STUDENT_TYPE: usize = 5;
const ERASMUS: usize = 6;
const NATIONALITY: usize = 7;
const RESIDENCY: usize = 8;

pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

pub(crate) fn parse_registrations<R: Read>(
    reader: R,
    timestamp_format: &str,
) -> Result<Vec<Registration>, RegistrationImportError> {
    let mut csv_reader = csv_reader(reader);
    let mut registrations = Vec::new();

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = index + 1;

        let raw_timestamp = required(&record, TIMESTAMP, row, "timestamp")?;
        let timestamp = NaiveDateTime::parse_from_str(raw_timestamp, timestamp_format).map_err(
            |source| RegistrationImportError::InvalidTimestamp {
                row,
                value: raw_timestamp.to_string(),
                source,
            },
        )?;
        let email = required(&record, EMAIL, row, "email")?;
        let name = required(&record, NAME, row, "name")?;
        // The column must exist; an empty answer still queues the person.
        if record.len() <= TIMESLOTS {
            return Err(RegistrationImportError::MissingField {
                row,
                field: "timeslots",
            });
        }
        let timeslots = cell(&record, TIMESLOTS).unwrap_or_default();

        let extras = RegistrationExtras {
            read_rules: cell(&record, READ_RULES).and_then(parse_yes_no),
            student_type: cell(&record, STUDENT_TYPE).map(str::to_string),
            erasmus: cell(&record, ERASMUS).and_then(parse_yes_no),
            nationality: cell(&record, NATIONALITY).map(str::to_string),
            residency: cell(&record, RESIDENCY).map(str::to_string),
        };

        registrations.push(
            Registration::new(Person::new(name, email), timestamp, timeslots.split(','))
                .with_extras(extras),
        );
    }

    registrations.sort_by_key(|registration| registration.timestamp);
    Ok(registrations)
}

/// Trimmed, non-empty cell.
pub(crate) fn cell(record: &StringRecord, index: usize) -> Option<&str> {
    record
        .get(index)
        .map(|value| value.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}'))
        .filter(|value| !value.is_empty())
}

fn required<'r>(
    record: &'r StringRecord,
    index: usize,
    row: usize,
    field: &'static str,
) -> Result<&'r str, RegistrationImportError> {
    cell(record, index).ok_or(RegistrationImportError::MissingField { row, field })
}

pub(crate) fn parse_yes_no(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "y" | "true" | "ja" | "1" => Some(true),
        "no" | "n" | "false" | "nei" | "0" => Some(false),
        _ => None,
    }
}
