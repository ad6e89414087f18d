mod admit;
mod cli;
mod infra;
mod routes;
mod server;

use opening_admittance::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
