mod analyze;
mod cli;
mod infra;
mod report;
mod routes;
mod server;

use xpendit::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
