pub mod domain;
pub mod identity;
mod opening;
pub mod preprocess;
pub mod remarks;
pub mod report;
pub mod timeslot;

#[cfg(test)]
mod tests;

pub use domain::{ConfirmedDuplicates, Placement, Registration, RegistrationExtras};
pub use identity::{Person, SimilarityMatcher};
pub use opening::{AdmissionSummary, Opening, OpeningError, RemovalOutcome};
pub use preprocess::{PreprocessPolicy, Preprocessor, Promotion};
pub use remarks::{Remark, RemarkLog};
pub use report::{write_csv_report, OpeningReport, ReportError};
pub use timeslot::{Timeslot, TimeslotSpec, TimeslotSpecError};
