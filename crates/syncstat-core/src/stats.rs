//! Run-end counters

use std::fmt;

use serde::Serialize;

/// Counters accumulated across one run.
///
/// Threaded by `&mut` through every stage. Per-file failures only ever
/// show up here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Paths yielded by the scanner
    pub total: usize,
    /// Records classified `ADDED` this run
    pub added: usize,
    /// Records classified `MODIFIED` this run
    pub modified: usize,
    /// Successful puts
    pub uploaded: usize,
    /// Successful deletes
    pub deleted: usize,
    /// All per-file errors
    pub errors: usize,
    /// Paths that could not be stat'ed
    pub stat_errors: usize,
    /// Puts or deletes that returned a non-zero status
    pub transfer_errors: usize,
    /// Set when the marker diff could not be computed; no deletes ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_error: Option<String>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stat_error(&mut self) {
        self.stat_errors += 1;
        self.errors += 1;
    }

    pub fn record_transfer_error(&mut self) {
        self.transfer_errors += 1;
        self.errors += 1;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}. Added: {}. Modified: {}. Uploaded: {}. Deleted: {}. Errors: {}.",
            self.total, self.added, self.modified, self.uploaded, self.deleted, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_breakdowns_roll_up_into_errors() {
        let mut stats = RunStats::new();
        stats.record_stat_error();
        stats.record_transfer_error();
        stats.record_transfer_error();

        assert_eq!(stats.errors, 3);
        assert_eq!(stats.stat_errors, 1);
        assert_eq!(stats.transfer_errors, 2);
    }

    #[test]
    fn display_matches_report_line() {
        let stats = RunStats {
            total: 10,
            added: 2,
            modified: 1,
            uploaded: 3,
            deleted: 1,
            errors: 0,
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "Total: 10. Added: 2. Modified: 1. Uploaded: 3. Deleted: 1. Errors: 0."
        );
    }

    #[test]
    fn removal_error_only_serialized_when_set() {
        let mut stats = RunStats::new();
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("removal_error").is_none());
        assert_eq!(json["errors"], 0);

        stats.removal_error = Some("previous listing unsorted".into());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["removal_error"], "previous listing unsorted");
    }
}
