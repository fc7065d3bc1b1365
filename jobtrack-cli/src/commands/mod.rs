//! Command implementations for the `jobtrack` CLI.
//!
//! Commands are generic over the gateway so they run the same against the
//! SQLite store and an in-memory one.

/// Raw input helpers: text from files or stdin, JSON objects, `key=value` pairs.
pub mod input;

/// `add-job`, `update-job`, `delete-job`, `list-jobs`.
pub mod jobs;

/// `add-resume`, `update-resume`, `add-template`, `update-template`, `render`.
pub mod resumes;

/// `add-user`, `delete-user`.
pub mod users;

use std::error::Error;

use colored::Colorize;
use jobtrack::{Managers, Response};
use jobtrack_core::JobtrackConfig;
use jobtrack_data_sqlx::SqlGateway;

pub type CliResult = Result<(), Box<dyn Error>>;

/// Load the configuration for `profile`, set up tracing and open the store.
pub async fn open(profile: &str) -> Result<Managers<SqlGateway>, Box<dyn Error>> {
    let config = JobtrackConfig::load(profile)?;
    let settings = config.settings()?;
    jobtrack_core::init_tracing(&settings.log);
    let pool = jobtrack::store::connect(&settings.database).await?;
    Ok(Managers::sql(&pool, settings.database.multitenant, settings.retry.policy()))
}

/// Print a success with `describe`, or turn a failure into an error.
pub fn report<T>(response: Response<T>, describe: impl FnOnce(&T) -> String) -> Result<T, Box<dyn Error>> {
    match response {
        Response::Success(value) => {
            println!("{} {}", "✓".green(), describe(&value));
            Ok(value)
        }
        Response::Failure(failure) => {
            for error in &failure.errors {
                eprintln!("  {} {}: {}", "-".red(), error.parameter.yellow(), error.message);
            }
            Err(format!("{}: {}", failure.kind, failure.message).into())
        }
    }
}
