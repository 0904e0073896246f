//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::Parser;
use syncstat_core::{RemovalStrategy, Window};

/// Mirror changed files of a directory tree to S3 with s3cmd
///
/// Only files added or modified since the previous run are uploaded, and
/// files that disappeared are deleted remotely. State lives in the marker
/// directory.
///
/// Examples:
///   syncstat -p /srv/media -s media-backup/daily
///   syncstat -p /srv/media -s media-backup -t 10 -u minute -l 500
///   syncstat -s media-backup -- --dry-run --acl-public
#[derive(Parser, Debug)]
#[command(name = "syncstat")]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// Path to the target directory [default: current directory]
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Remote location, format: BUCKET[/PREFIX]
    #[arg(short, long, value_name = "BUCKET[/PREFIX]")]
    pub s3: Option<String>,

    /// Print debug information
    #[arg(short, long)]
    pub debug: bool,

    /// Upload every file regardless of modification time
    #[arg(short, long)]
    pub ignore_mtime: bool,

    /// Maximum number of files dispatched per --per window
    #[arg(short, long, value_name = "FILES")]
    pub throughput: Option<u32>,

    /// Window for --throughput: second, minute, hour, or day
    #[arg(short = 'u', long, value_name = "WINDOW")]
    pub per: Option<Window>,

    /// Maximum number of uploads plus deletes this run
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Directory for marker files and state [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    pub marker_dir: Option<PathBuf>,

    /// SQLite database file [default: <marker-dir>/files.sqlite]
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Paths reconciled per database round-trip [default: 1000]
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// How removed files are detected: sweep or markers [default: sweep]
    #[arg(long, value_name = "STRATEGY")]
    pub removal: Option<RemovalStrategy>,

    /// TOML or JSON file with run settings; flags override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// s3cmd executable to run
    #[arg(long, env = "SYNCSTAT_S3CMD", default_value = "s3cmd", hide = true)]
    pub s3cmd: PathBuf,

    /// Extra arguments passed verbatim to every s3cmd call
    #[arg(last = true, value_name = "S3CMD_ARGS")]
    pub s3cmd_args: Vec<String>,
}
