use crate::infra::{
    apply_removals, build_opening, parse_disallowed, DisallowedPath, OpeningInputs, RemovalTally,
};
use clap::Args;
use opening_admittance::config::{parse_threshold, AdmittanceConfig, AppConfig};
use opening_admittance::error::AppError;
use opening_admittance::telemetry;
use opening_admittance::workflows::admittance::{
    write_csv_report, AdmissionSummary, ConfirmedDuplicates, Opening, OpeningReport, TimeslotSpec,
};
use opening_admittance::workflows::registrations::{
    ConfirmedDuplicatesImporter, MissingTable, PeopleColumns, PeopleTable, RegistrationImporter,
};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct AdmitArgs {
    /// Registration form export (CSV with a header row)
    #[arg(long)]
    pub(crate) registrations: PathBuf,
    /// Timeslot as NAME=CAPACITY, or NAME for no limit; repeat for every slot
    #[arg(long = "timeslot", required = true)]
    pub(crate) timeslots: Vec<TimeslotSpec>,
    /// People banned from the opening (name,email CSV)
    #[arg(long)]
    pub(crate) ban_list: Option<PathBuf>,
    /// SLOT=PATH table of people barred from one timeslot; repeatable
    #[arg(long, value_parser = parse_disallowed)]
    pub(crate) disallowed: Vec<DisallowedPath>,
    /// Confirmed duplicate identities (name,email[,duplicate-of name,duplicate-of email])
    #[arg(long)]
    pub(crate) confirmed_duplicates: Option<PathBuf>,
    /// People who cancelled after allocation (name,email CSV)
    #[arg(long)]
    pub(crate) cancellations: Option<PathBuf>,
    /// People banned after allocation (name,email CSV)
    #[arg(long)]
    pub(crate) late_bans: Option<PathBuf>,
    /// Override the configured similarity threshold, in (0, 1]
    #[arg(long, value_parser = parse_threshold)]
    pub(crate) similarity_threshold: Option<f64>,
    /// Override the configured registration timestamp format
    #[arg(long)]
    pub(crate) timestamp_format: Option<String>,
    /// Write per-slot and summary CSV files into this directory
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Print the full report as JSON after the summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) struct AdmitOutcome {
    pub(crate) admission: AdmissionSummary,
    pub(crate) report: OpeningReport,
    pub(crate) cancellations: RemovalTally,
    pub(crate) late_bans: RemovalTally,
    pub(crate) written: Vec<PathBuf>,
}

pub(crate) fn run_admit(args: AdmitArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let json = args.json;
    let outcome = execute(args, config.admittance)?;
    render_opening_report(&outcome);

    if json {
        println!("{}", outcome.report.to_json_pretty()?);
    }

    Ok(())
}

pub(crate) fn execute(
    args: AdmitArgs,
    mut settings: AdmittanceConfig,
) -> Result<AdmitOutcome, AppError> {
    if let Some(threshold) = args.similarity_threshold {
        settings.similarity_threshold = threshold;
    }
    if let Some(format) = args.timestamp_format {
        settings.timestamp_format = format;
    }

    let registrations =
        RegistrationImporter::from_path(&args.registrations, &settings.timestamp_format)?;

    let ban_list = optional_table(args.ban_list.as_deref())?;
    let disallowed = args
        .disallowed
        .into_iter()
        .map(|entry| {
            PeopleTable::from_path(&entry.path, PeopleColumns::PLAIN, MissingTable::Fail)
                .map(|people| (entry.timeslot, people))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let confirmed = match args.confirmed_duplicates {
        Some(path) => ConfirmedDuplicatesImporter::from_path(path, MissingTable::Fail)?,
        None => ConfirmedDuplicates::new(),
    };

    let mut opening = build_opening(
        OpeningInputs {
            timeslots: args.timeslots,
            ban_list,
            disallowed,
            confirmed,
        },
        settings.preprocessor(),
    )?;

    let cancellations = optional_table(args.cancellations.as_deref())?;
    let late_bans = optional_table(args.late_bans.as_deref())?;

    let admission = opening.auto_admit(registrations);
    let cancellations = apply_removals(&mut opening, cancellations, Opening::cancel);
    let late_bans = apply_removals(&mut opening, late_bans, Opening::ban);

    let report = OpeningReport::from_opening(&opening);
    let written = match &args.output_dir {
        Some(dir) => write_csv_report(&report, dir, &settings.timestamp_format)?,
        None => Vec::new(),
    };

    Ok(AdmitOutcome {
        admission,
        report,
        cancellations,
        late_bans,
        written,
    })
}

fn optional_table(path: Option<&Path>) -> Result<PeopleTable, AppError> {
    match path {
        Some(path) => Ok(PeopleTable::from_path(
            path,
            PeopleColumns::PLAIN,
            MissingTable::Fail,
        )?),
        None => Ok(PeopleTable::default()),
    }
}

fn render_opening_report(outcome: &AdmitOutcome) {
    let AdmitOutcome {
        admission,
        report,
        cancellations,
        late_bans,
        written,
    } = outcome;

    println!("Opening admittance");
    println!(
        "- {} canonical registrations | {} skipped | {} admitted | {} waiting",
        admission.canonical, admission.skipped, admission.admitted, admission.waiting
    );
    if cancellations.removed > 0 || late_bans.removed > 0 {
        println!(
            "- {} cancelled | {} banned after allocation",
            cancellations.removed, late_bans.removed
        );
    }
    for (action, tally) in [("cancel", cancellations), ("ban", late_bans)] {
        for person in &tally.not_found {
            println!("- could not {action} {person}: not admitted or waiting");
        }
    }

    println!("\nTimeslots:");
    for slot in &report.timeslots {
        let capacity = slot
            .capacity
            .map(|capacity| capacity.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        println!("  - {}: {}/{}", slot.name, slot.spots_taken, capacity);
    }

    println!("\nWaiting list ({}):", report.waiting_list.len());
    for (position, entry) in report.waiting_list.iter().enumerate() {
        println!("  {}. {} <{}>", position + 1, entry.name, entry.email);
    }

    if !report.remarked.is_empty() {
        println!("\nNeeds review ({}):", report.remarked.len());
        for entry in &report.remarked {
            println!(
                "  - {} <{}> [{}]",
                entry.name, entry.email, entry.placement_label
            );
            for remark in &entry.remarks {
                println!("      {remark}");
            }
        }
    }

    if !written.is_empty() {
        println!("\nWrote {} files:", written.len());
        for path in written {
            println!("  - {}", path.display());
        }
    }
}
