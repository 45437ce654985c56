mod cli;
mod commands;
mod infra;

use supplement_optimizer::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
