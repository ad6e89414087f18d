use crate::admit::{run_admit, AdmitArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use opening_admittance::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Opening Admittance",
    about = "Allocate opening timeslots from registration exports, or serve the allocation API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one admittance batch from CSV files and print the result
    Admit(AdmitArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Admit(args) => run_admit(args),
    }
}
