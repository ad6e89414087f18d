use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::views::{OpeningReport, PersonView, RegistrationView};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to prepare report directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

const REGISTRATION_HEADER: [&str; 10] = [
    "timestamp",
    "name",
    "email",
    "timeslots",
    "read_rules",
    "student_type",
    "erasmus",
    "nationality",
    "residency",
    "remarks",
];

/// Writes one CSV per timeslot plus the waiting list, cancelled, banned and
/// remark tables into `dir`, creating it when needed. Timestamps are written
/// with `timestamp_format` so the files read back like the registration export.
pub fn write_csv_report(
    report: &OpeningReport,
    dir: impl AsRef<Path>,
    timestamp_format: &str,
) -> Result<Vec<PathBuf>, ReportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();

    for slot in &report.timeslots {
        let path = dir.join(format!("{}.csv", file_stem(&slot.name)));
        write_registrations(&path, &slot.admitted, timestamp_format)?;
        written.push(path);
    }

    let path = dir.join("waiting_list.csv");
    write_registrations(&path, &report.waiting_list, timestamp_format)?;
    written.push(path);

    let path = dir.join("cancelled.csv");
    write_people(&path, &report.cancelled)?;
    written.push(path);

    let path = dir.join("banned.csv");
    write_people(&path, &report.banned)?;
    written.push(path);

    let path = dir.join("remarks.csv");
    write_rows(
        &path,
        &["name", "email", "placement", "remark"],
        report.remarked.iter().flat_map(|entry| {
            entry.remarks.iter().map(move |remark| {
                vec![
                    entry.name.clone(),
                    entry.email.clone(),
                    entry.placement_label.to_string(),
                    remark.clone(),
                ]
            })
        }),
    )?;
    written.push(path);

    info!(directory = %dir.display(), files = written.len(), "report written");
    Ok(written)
}

fn file_stem(timeslot: &str) -> String {
    timeslot
        .chars()
        .filter(|c| *c != ':')
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect()
}

fn write_registrations(
    path: &Path,
    registrations: &[RegistrationView],
    timestamp_format: &str,
) -> Result<(), ReportError> {
    write_rows(
        path,
        &REGISTRATION_HEADER,
        registrations.iter().map(|registration| {
            let extras = &registration.extras;
            vec![
                registration.timestamp.format(timestamp_format).to_string(),
                registration.name.clone(),
                registration.email.clone(),
                registration.timeslots.join(", "),
                yes_no(extras.read_rules),
                extras.student_type.clone().unwrap_or_default(),
                yes_no(extras.erasmus),
                extras.nationality.clone().unwrap_or_default(),
                extras.residency.clone().unwrap_or_default(),
                registration.remarks.join("; "),
            ]
        }),
    )
}

fn write_people(path: &Path, people: &[PersonView]) -> Result<(), ReportError> {
    write_rows(
        path,
        &["name", "email"],
        people
            .iter()
            .map(|person| vec![person.name.clone(), person.email.clone()]),
    )
}

fn write_rows<I>(path: &Path, header: &[&str], rows: I) -> Result<(), ReportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(header).map_err(csv_error)?;
    for row in rows {
        writer.write_record(&row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn yes_no(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeslot_file_names_drop_colons() {
        assert_eq!(file_stem("10:00-11:00"), "1000-1100");
        assert_eq!(file_stem("a/b"), "a-b");
    }
}
