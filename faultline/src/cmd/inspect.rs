//! `faultline inspect` command — summarise the root failure of a snapshot.

use std::fmt::Write as _;
use std::path::Path;

use faultline::walker::{render_tree, unwrap_corruption};
use faultline::{Error, Failure, Limits, format_chain};

use super::load_snapshot;

/// Execute the `inspect` command.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be loaded or names no root.
#[allow(clippy::print_stdout)]
pub fn run(snapshot: &Path, limits: &Limits) -> Result<(), Error> {
    let graph = load_snapshot(snapshot)?.build()?;
    let root = graph
        .root
        .ok_or_else(|| Error::snapshot("snapshot has no root node to inspect"))?;
    print!("{}", describe(&root, limits));
    Ok(())
}

/// Renders the inspection report for `root`.
fn describe(root: &Failure, limits: &Limits) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "summary:    {}", format_chain(Some(root)));
    let _ = writeln!(out, "cause:      {}", limits.unwrap_cause(root));
    let _ = writeln!(out, "corruption: {}", display_or_none(unwrap_corruption(root)));
    match limits.find_fatal(root) {
        Some(fatal) => {
            tracing::warn!(%fatal, "snapshot contains a fatal failure");
            let _ = writeln!(out, "fatal:      {fatal}");
        }
        None => {
            let _ = writeln!(out, "fatal:      none");
        }
    }
    out.push_str("tree:\n");
    out.push_str(&render_tree(root));
    out
}

fn display_or_none(failure: Option<&Failure>) -> String {
    failure.map_or_else(|| "none".to_owned(), ToString::to_string)
}
