//! syncstat CLI
//!
//! Scans a directory, records what changed since the last run, and
//! mirrors the changes to S3 through s3cmd.

mod cli;
mod error;
mod logging;
mod run;
mod s3cmd;

use clap::Parser;
use colored::Colorize;

use cli::Cli;
use error::Result;

fn main() {
    if let Err(e) = execute() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn execute() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug)?;
    run::run_sync(&cli)?;
    Ok(())
}
