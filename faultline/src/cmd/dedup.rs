//! `faultline dedup` command — deduplicate the reports of a snapshot.

use std::fmt::Write as _;
use std::path::Path;

use faultline::{Error, Failure, FailureReport, deduplicate};

use super::load_snapshot;

/// Execute the `dedup` command.
///
/// Prints one line per kept report, in order of first occurrence.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn run(snapshot: &Path) -> Result<(), Error> {
    let reports = load_snapshot(snapshot)?.build()?.reports;
    let total = reports.len();
    let kept = deduplicate(reports);
    tracing::info!(total, kept = kept.len(), "deduplicated failure reports");
    print!("{}", describe(&kept));
    Ok(())
}

fn describe(reports: &[FailureReport<Failure>]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(
            out,
            "[{}] {}",
            report.resource().unwrap_or("-"),
            report.message()
        );
    }
    out
}
