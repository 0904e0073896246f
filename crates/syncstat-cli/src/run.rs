//! The sync run: settings resolution, engine invocation, and report

use colored::Colorize;
use syncstat_core::{RunConfig, RunStats, SyncEngine, Throughput, Window};

use crate::cli::Cli;
use crate::error::{CliError, Result};
use crate::s3cmd::{S3CmdRemote, remote_prefix};

/// Merge the config file (if any) with command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    if let Some(path) = &cli.path {
        config.directory = path.clone();
    }
    if let Some(dir) = &cli.marker_dir {
        config.marker_dir = dir.clone();
    }
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(limit) = cli.limit {
        config.limit = Some(limit);
    }
    if let Some(removal) = cli.removal {
        config.removal = removal;
    }
    config.ignore_mtime |= cli.ignore_mtime;

    config.throughput = match (cli.throughput, config.throughput) {
        (Some(files), current) => Some(Throughput::new(
            files,
            cli.per
                .or(current.map(|t| t.per))
                .unwrap_or(Window::Second),
        )),
        (None, Some(current)) => Some(Throughput::new(current.files, cli.per.unwrap_or(current.per))),
        (None, None) => None,
    };

    match &cli.s3 {
        Some(location) if !location.trim_matches('/').is_empty() => {
            config.remote.prefix = remote_prefix(location);
        }
        Some(_) => return Err(CliError::user("--s3 can not be empty")),
        None if config.remote.prefix.is_empty() => {
            return Err(CliError::user("--s3 is required, format: BUCKET[/PREFIX]"));
        }
        None => {}
    }

    Ok(config)
}

/// Execute one run and print the report.
///
/// Per-file errors only show up in the counters. A failed removal diff
/// is reported after the counters and fails the command.
pub fn run_sync(cli: &Cli) -> Result<RunStats> {
    let config = resolve_config(cli)?;
    let engine = SyncEngine::new(config)?;
    print_header(engine.config());

    let mut remote = S3CmdRemote::new(&cli.s3cmd, cli.s3cmd_args.clone());
    let stats = engine.run(&mut remote)?;

    print_report(&stats);
    if let Some(message) = &stats.removal_error {
        return Err(CliError::user(format!(
            "deletes skipped, removal detection failed: {message}"
        )));
    }
    Ok(stats)
}

fn print_header(config: &RunConfig) {
    println!(
        "{} Syncing {} to {}",
        "=>".blue().bold(),
        config.directory.display().to_string().cyan(),
        config.remote.prefix.cyan()
    );
}

fn print_report(stats: &RunStats) {
    let status = if stats.errors == 0 {
        "OK".green().bold()
    } else {
        "DONE".yellow().bold()
    };
    println!("{status} {stats}");
    if stats.stat_errors > 0 {
        println!(
            "   {} {} file(s) could not be read",
            "!".yellow(),
            stats.stat_errors
        );
    }
    if stats.transfer_errors > 0 {
        println!(
            "   {} {} transfer(s) failed and will be retried next run",
            "!".yellow(),
            stats.transfer_errors
        );
    }
}
