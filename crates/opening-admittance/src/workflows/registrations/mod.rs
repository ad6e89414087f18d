//! CSV intake for the registration form export and the person lookup tables
//! (ban list, disallowed lists and confirmed duplicates).

mod parser;

use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::workflows::admittance::{ConfirmedDuplicates, Person, Registration};

#[derive(Debug)]
pub enum RegistrationImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingField {
        row: usize,
        field: &'static str,
    },
    InvalidTimestamp {
        row: usize,
        value: String,
        source: chrono::ParseError,
    },
    ColumnOutOfBounds {
        column: usize,
        columns: usize,
    },
}

impl std::fmt::Display for RegistrationImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationImportError::Io(err) => write!(f, "failed to read CSV file: {}", err),
            RegistrationImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            RegistrationImportError::MissingField { row, field } => {
                write!(f, "row {} is missing the {} field", row, field)
            }
            RegistrationImportError::InvalidTimestamp { row, value, source } => write!(
                f,
                "row {} has an invalid timestamp '{}': {}",
                row, value, source
            ),
            RegistrationImportError::ColumnOutOfBounds { column, columns } => write!(
                f,
                "column {} is out of bounds for a table with {} columns",
                column, columns
            ),
        }
    }
}

impl std::error::Error for RegistrationImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistrationImportError::Io(err) => Some(err),
            RegistrationImportError::Csv(err) => Some(err),
            RegistrationImportError::InvalidTimestamp { source, .. } => Some(source),
            RegistrationImportError::MissingField { .. }
            | RegistrationImportError::ColumnOutOfBounds { .. } => None,
        }
    }
}

impl From<std::io::Error> for RegistrationImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RegistrationImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads the form export. Any malformed row fails the whole import.
pub struct RegistrationImporter;

impl RegistrationImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        timestamp_format: &str,
    ) -> Result<Vec<Registration>, RegistrationImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, timestamp_format)
    }

    /// Registrations come back sorted by timestamp; rows with equal
    /// timestamps keep their file order.
    pub fn from_reader<R: Read>(
        reader: R,
        timestamp_format: &str,
    ) -> Result<Vec<Registration>, RegistrationImportError> {
        let registrations = parser::parse_registrations(reader, timestamp_format)?;
        info!(count = registrations.len(), "registrations imported");
        Ok(registrations)
    }
}

/// What to do when an optional lookup table does not exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingTable {
    Fail,
    Empty,
}

/// Zero-based positions of the name and email columns in a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeopleColumns {
    pub name: usize,
    pub email: usize,
}

impl PeopleColumns {
    /// Same layout as the registration form export.
    pub const FORM_EXPORT: Self = Self { name: 2, email: 1 };
    pub const PLAIN: Self = Self { name: 0, email: 1 };

    fn widest(&self) -> usize {
        self.name.max(self.email)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleTable {
    people: Vec<Person>,
}

impl PeopleTable {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        columns: PeopleColumns,
        missing: MissingTable,
    ) -> Result<Self, RegistrationImportError> {
        let path = path.as_ref();
        match open_table(path, missing)? {
            Some(file) => Self::from_reader(file, columns),
            None => Ok(Self::default()),
        }
    }

    pub fn from_reader<R: Read>(
        reader: R,
        columns: PeopleColumns,
    ) -> Result<Self, RegistrationImportError> {
        let mut csv_reader = parser::csv_reader(reader);
        let width = csv_reader.headers()?.len();
        if columns.widest() >= width {
            return Err(RegistrationImportError::ColumnOutOfBounds {
                column: columns.widest(),
                columns: width,
            });
        }

        let mut people = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let name = parser::cell(&record, columns.name).unwrap_or_default();
            let email = parser::cell(&record, columns.email).unwrap_or_default();
            if name.is_empty() && email.is_empty() {
                continue;
            }
            people.push(Person::new(name, email));
        }

        debug!(count = people.len(), "people table imported");
        Ok(Self { people })
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}

impl IntoIterator for PeopleTable {
    type Item = Person;
    type IntoIter = std::vec::IntoIter<Person>;

    fn into_iter(self) -> Self::IntoIter {
        self.people.into_iter()
    }
}

/// Reads `name, email[, duplicate-of name, duplicate-of email]` rows. A row
/// with the last two columns filled confirms that pair; otherwise the listed
/// person is confirmed against anyone similar.
pub struct ConfirmedDuplicatesImporter;

impl ConfirmedDuplicatesImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        missing: MissingTable,
    ) -> Result<ConfirmedDuplicates, RegistrationImportError> {
        match open_table(path.as_ref(), missing)? {
            Some(file) => Self::from_reader(file),
            None => Ok(ConfirmedDuplicates::new()),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ConfirmedDuplicates, RegistrationImportError> {
        let mut csv_reader = parser::csv_reader(reader);
        let mut confirmed = ConfirmedDuplicates::new();

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = index + 1;
            let name = parser::cell(&record, 0).unwrap_or_default();
            let email = parser::cell(&record, 1).unwrap_or_default();
            if name.is_empty() && email.is_empty() {
                return Err(RegistrationImportError::MissingField { row, field: "email" });
            }
            let person = Person::new(name, email);

            match (parser::cell(&record, 2), parser::cell(&record, 3)) {
                (None, None) => confirmed.confirm_person(person),
                (other_name, other_email) => confirmed.confirm_pair(
                    person,
                    Person::new(
                        other_name.unwrap_or_default(),
                        other_email.unwrap_or_default(),
                    ),
                ),
            }
        }

        debug!(count = confirmed.len(), "confirmed duplicates imported");
        Ok(confirmed)
    }
}

fn open_table(
    path: &Path,
    missing: MissingTable,
) -> Result<Option<std::fs::File>, RegistrationImportError> {
    match std::fs::File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(err)
            if err.kind() == std::io::ErrorKind::NotFound && missing == MissingTable::Empty =>
        {
            debug!(path = %path.display(), "optional table not found, using an empty one");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TIMESTAMP_FORMAT;
    use std::io::Cursor;

    const HEADER: &str = "Timestamp,Email,Name,Timeslots,Read rules,Student type,Erasmus,Nationality,Residency\n";

    fn import(body: &str) -> Result<Vec<Registration>, RegistrationImportError> {
        RegistrationImporter::from_reader(
            Cursor::new(format!("{HEADER}{body}")),
            DEFAULT_TIMESTAMP_FORMAT,
        )
    }

    #[test]
    fn importer_reads_required_and_optional_columns() {
        let registrations = import(
            "18/08/2022 18:04:40,KateMccoy@gmail.com,Kate Mccoy,\"10:00 - 11:00, 11:00 - 12:00\",Yes,Bachelor,nei,Norwegian,Trondheim\n",
        )
        .expect("import succeeds");

        let registration = &registrations[0];
        assert_eq!(
            registration.person,
            Person::new("kate mccoy", "katemccoy@gmail.com")
        );
        assert_eq!(registration.timeslots, vec!["10:00-11:00", "11:00-12:00"]);
        assert_eq!(registration.extras.read_rules, Some(true));
        assert_eq!(registration.extras.erasmus, Some(false));
        assert_eq!(registration.extras.student_type.as_deref(), Some("Bachelor"));
        assert_eq!(registration.extras.residency.as_deref(), Some("Trondheim"));
    }

    #[test]
    fn importer_accepts_rows_without_optional_columns() {
        let registrations = import("18/08/2022 18:04:40,riverfry@gmail.com,River Fry,a\n")
            .expect("import succeeds");
        assert_eq!(
            registrations[0].extras,
            crate::workflows::admittance::RegistrationExtras::default()
        );
    }

    #[test]
    fn importer_sorts_by_timestamp_keeping_ties_in_file_order() {
        let registrations = import(
            "18/08/2022 18:05:00,c@example.org,Carl Late,a\n\
18/08/2022 18:04:40,a@example.org,Anna First,a\n\
18/08/2022 18:04:40,b@example.org,Bo Second,a\n",
        )
        .expect("import succeeds");

        let names: Vec<&str> = registrations
            .iter()
            .map(|registration| registration.person.name())
            .collect();
        assert_eq!(names, vec!["anna first", "bo second", "carl late"]);
    }

    #[test]
    fn invalid_timestamp_names_the_row() {
        let error = import(
            "18/08/2022 18:04:40,a@example.org,Anna First,a\n2022-08-18,b@example.org,Bo Second,a\n",
        )
        .expect_err("expected timestamp error");

        match error {
            RegistrationImportError::InvalidTimestamp { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "2022-08-18");
            }
            other => panic!("expected invalid timestamp, got {other:?}"),
        }
    }

    #[test]
    fn missing_email_fails_the_import() {
        let error = import("18/08/2022 18:04:40,,Anna First,a\n").expect_err("expected error");
        match error {
            RegistrationImportError::MissingField { row, field } => {
                assert_eq!((row, field), (1, "email"));
            }
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn row_without_timeslots_column_fails_the_import() {
        let error = import(
            "18/08/2022 18:04:40,b@example.org,Bo Second,a\n\
18/08/2022 18:04:40,a@example.org,Anna First\n",
        )
        .expect_err("expected error");
        match error {
            RegistrationImportError::MissingField { row, field } => {
                assert_eq!((row, field), (2, "timeslots"));
            }
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn empty_timeslots_cell_is_accepted() {
        let registrations =
            import("18/08/2022 18:04:40,a@example.org,Anna First,\n").expect("import succeeds");
        assert!(registrations[0].timeslots.is_empty());
    }

    #[test]
    fn yes_no_cells_are_lenient() {
        assert_eq!(parser::parse_yes_no("JA"), Some(true));
        assert_eq!(parser::parse_yes_no("n"), Some(false));
        assert_eq!(parser::parse_yes_no("maybe"), None);
    }

    #[test]
    fn people_table_uses_configured_columns() {
        let csv = "Timestamp,Email,Name\n18/08/2022 18:04:40,riverfry@gmail.com,River Fry\n,,\n";
        let table = PeopleTable::from_reader(Cursor::new(csv), PeopleColumns::FORM_EXPORT)
            .expect("table imports");
        assert_eq!(table.people(), &[Person::new("River Fry", "riverfry@gmail.com")]);
    }

    #[test]
    fn people_table_rejects_columns_past_the_header() {
        let error = PeopleTable::from_reader(
            Cursor::new("Name,Email\nRiver Fry,riverfry@gmail.com\n"),
            PeopleColumns::FORM_EXPORT,
        )
        .expect_err("expected bounds error");
        match error {
            RegistrationImportError::ColumnOutOfBounds { column, columns } => {
                assert_eq!((column, columns), (2, 2));
            }
            other => panic!("expected column bounds error, got {other:?}"),
        }
    }

    #[test]
    fn missing_optional_table_can_be_empty() {
        let table = PeopleTable::from_path(
            "./does-not-exist.csv",
            PeopleColumns::PLAIN,
            MissingTable::Empty,
        )
        .expect("missing table tolerated");
        assert!(table.is_empty());

        let error = PeopleTable::from_path(
            "./does-not-exist.csv",
            PeopleColumns::PLAIN,
            MissingTable::Fail,
        )
        .expect_err("expected io error");
        assert!(matches!(error, RegistrationImportError::Io(_)));
    }

    #[test]
    fn confirmed_duplicates_support_people_and_pairs() {
        let csv = "Name,Email,Duplicate of name,Duplicate of email\n\
Ola Nordmann,ola2@example.org,,\n\
Kari Nordmann,kari@example.org,Kari Nordman,kari.n@example.org\n";
        let confirmed =
            ConfirmedDuplicatesImporter::from_reader(Cursor::new(csv)).expect("table imports");

        let ola = Person::new("Ola Nordmann", "ola2@example.org");
        let kari = Person::new("Kari Nordmann", "kari@example.org");
        let kari_alias = Person::new("Kari Nordman", "kari.n@example.org");

        assert_eq!(confirmed.len(), 2);
        assert!(confirmed.confirms(&ola, &Person::new("Ola Nordmann", "ola@example.org")));
        assert!(confirmed.confirms(&kari_alias, &kari));
        assert!(!confirmed.confirms(&kari, &ola));
    }
}
