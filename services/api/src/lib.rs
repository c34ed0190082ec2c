mod billing;
mod cli;
mod infra;
mod preview;
mod render;
mod routes;
mod server;

use upkyp::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
