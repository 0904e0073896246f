//! `RemoteStore` backed by the s3cmd command-line tool

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use syncstat_core::{DispatchOutcome, RemoteStore};
use tracing::debug;

/// URL scheme s3cmd expects on remote paths.
const SCHEME: &str = "s3://";

/// Runs `s3cmd <args...> put|del ...` once per dispatch.
#[derive(Debug, Clone)]
pub struct S3CmdRemote {
    program: PathBuf,
    args: Vec<String>,
}

impl S3CmdRemote {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn execute(&self, action: &str, operands: &[&OsStr]) -> DispatchOutcome {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(action).args(operands);
        debug!(command = ?cmd, "Running s3cmd");

        match cmd.output() {
            Ok(output) => outcome(&output),
            Err(e) => DispatchOutcome::failed(
                -1,
                format!("failed to run {}: {e}", self.program.display()),
            ),
        }
    }
}

impl RemoteStore for S3CmdRemote {
    fn put(&mut self, local: &Path, remote_id: &str) -> DispatchOutcome {
        self.execute("put", &[local.as_os_str(), OsStr::new(remote_id)])
    }

    fn delete(&mut self, remote_id: &str) -> DispatchOutcome {
        self.execute("del", &[OsStr::new(remote_id)])
    }
}

/// Remote prefix for a `BUCKET[/PREFIX]` argument.
pub fn remote_prefix(location: &str) -> String {
    let location = location.strip_prefix(SCHEME).unwrap_or(location);
    format!("{SCHEME}{}", location.trim_matches('/'))
}

fn outcome(output: &Output) -> DispatchOutcome {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    match output.status.code() {
        Some(0) => DispatchOutcome {
            status: 0,
            output: text,
        },
        Some(code) => DispatchOutcome::failed(code, text),
        // Killed by a signal
        None => DispatchOutcome::failed(-1, text),
    }
}
