mod summary;
pub mod views;
mod writer;

pub use views::OpeningReport;
pub use writer::{write_csv_report, ReportError};
