mod cli;
mod infra;
mod routes;
mod server;

use requirement_alert::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
