//! Walking failure chains along their cause links.
//!
//! - [`unwrap_cause`] — strip pure wrappers down to the meaningful cause.
//! - [`format_chain`] — one-line diagnostic summary of a cause chain.
//! - [`unwrap_matching`] / [`unwrap_corruption`] — find a cause of a given kind.
//! - [`render_tree`] — multi-line dump including suppressed companions.
//!
//! Cause links may be cyclic. Every walk here is bounded by a step counter
//! and degrades to a best-effort answer plus a warning when the bound is hit.

use std::fmt::Write as _;

use tracing::warn;

use crate::failure::{Chained, FailureKind};
use crate::fatal::MAX_ITERATIONS;

/// Maximum number of wrapper levels [`unwrap_cause`] descends through.
pub const MAX_UNWRAP_DEPTH: usize = 10;

/// Iterator over a failure and its causes, outermost first.
///
/// Unbounded: on a cyclic chain it never ends. Callers cap it themselves.
#[derive(Debug)]
pub(crate) struct Causes<'a, F> {
    next: Option<&'a F>,
}

impl<'a, F: Chained> Iterator for Causes<'a, F> {
    type Item = &'a F;

    fn next(&mut self) -> Option<&'a F> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

/// Returns an iterator starting at `failure` and following its cause links.
pub(crate) const fn causes<F: Chained>(failure: &F) -> Causes<'_, F> {
    Causes {
        next: Some(failure),
    }
}

/// Unwraps pure wrapper failures down to the first meaningful cause.
///
/// Stops at the first node that is not a wrapper, has no cause, or is its
/// own cause. After [`MAX_UNWRAP_DEPTH`] levels a warning is logged and the
/// node reached so far is returned.
#[must_use]
pub fn unwrap_cause<F: Chained>(failure: &F) -> &F {
    unwrap_cause_bounded(failure, MAX_UNWRAP_DEPTH)
}

/// [`unwrap_cause`] with an explicit depth bound.
#[must_use]
pub fn unwrap_cause_bounded<F: Chained>(failure: &F, max_depth: usize) -> &F {
    let mut current = failure;
    let mut depth = 0;
    while current.is_wrapper() {
        let Some(cause) = current.cause() else {
            return current;
        };
        if cause.is_same(current) {
            return current;
        }
        if depth == max_depth {
            warn!(
                max_depth,
                kind = %failure.kind(),
                message = ?failure.message(),
                "failure cause unwrapping ran for {max_depth} levels, giving up"
            );
            return current;
        }
        current = cause;
        depth += 1;
    }
    current
}

/// Summarises the cause chain of `failure` on a single line.
///
/// Each node renders as `Kind[message]` (or `Kind` without a message),
/// joined by `"; nested: "`. Suppressed companions are not included. This
/// is a diagnostic string, not a stable format.
#[must_use]
pub fn format_chain<F: Chained>(failure: Option<&F>) -> String {
    let Some(failure) = failure else {
        return "Unknown".to_owned();
    };
    let mut out = String::new();
    let mut chain = causes(failure);
    for (position, node) in chain.by_ref().take(MAX_ITERATIONS).enumerate() {
        if position > 0 {
            out.push_str("; nested: ");
        }
        push_entry(&mut out, node);
    }
    if chain.next().is_some() {
        warn!(
            limit = MAX_ITERATIONS,
            kind = %failure.kind(),
            "failure chain too long to format, truncating"
        );
        out.push_str("; nested: ...");
    }
    out
}

fn push_entry<F: Chained>(out: &mut String, node: &F) {
    let _ = write!(out, "{}", node.kind());
    if let Some(message) = node.message() {
        let _ = write!(out, "[{message}]");
    }
}

/// Returns the first node along the cause chain whose kind is in `kinds`.
///
/// Suppressed companions are not searched.
#[must_use]
pub fn unwrap_matching<'a, F: Chained>(failure: &'a F, kinds: &[F::Kind]) -> Option<&'a F> {
    let mut chain = causes(failure);
    let found = chain
        .by_ref()
        .take(MAX_ITERATIONS)
        .find(|node| kinds.contains(&node.kind()));
    if found.is_none() && chain.next().is_some() {
        warn!(
            limit = MAX_ITERATIONS,
            kinds = ?kinds,
            "giving up looking for a matching failure cause"
        );
    }
    found
}

/// Returns the data-corruption failure buried in the cause chain, if any.
#[must_use]
pub fn unwrap_corruption<F>(failure: &F) -> Option<&F>
where
    F: Chained<Kind = FailureKind>,
{
    unwrap_matching(failure, &FailureKind::CORRUPTION)
}

/// Renders the whole failure graph, one node per line.
///
/// Suppressed companions are indented under their owner with a
/// `Suppressed:` prefix, causes follow with `Caused by:`. At most
/// [`MAX_ITERATIONS`] nodes are printed.
#[must_use]
pub fn render_tree<F: Chained>(failure: &F) -> String {
    let mut out = String::new();
    let mut budget = MAX_ITERATIONS;
    if !render_node(&mut out, failure, 0, "", &mut budget) {
        warn!(
            limit = MAX_ITERATIONS,
            kind = %failure.kind(),
            "failure graph too large to render, truncating"
        );
    }
    out
}

/// Returns `false` once the budget ran out.
fn render_node<F: Chained>(
    out: &mut String,
    node: &F,
    indent: usize,
    prefix: &str,
    budget: &mut usize,
) -> bool {
    let mut current = node;
    let mut prefix = prefix;
    loop {
        push_indent(out, indent);
        if *budget == 0 {
            out.push_str("...\n");
            return false;
        }
        *budget -= 1;
        out.push_str(prefix);
        let _ = write!(out, "{}", current.kind());
        if let Some(message) = current.message() {
            let _ = write!(out, ": {message}");
        }
        if let Some(resource) = current.resource() {
            let _ = write!(out, " (resource: {resource})");
        }
        out.push('\n');
        for companion in current.suppressed() {
            if !render_node(out, companion, indent + 1, "Suppressed: ", budget) {
                return false;
            }
        }
        let Some(cause) = current.cause() else {
            return true;
        };
        current = cause;
        prefix = "Caused by: ";
    }
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push('\t');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Failure;
    use tracing_test::traced_test;

    /// `levels` wrappers named `wrapper-0..` on top of an `Io` root.
    fn wrapper_chain(levels: usize) -> Failure {
        let mut failure = Failure::new(FailureKind::Io, "root");
        for level in (0..levels).rev() {
            failure =
                Failure::new(FailureKind::Remote, format!("wrapper-{level}")).with_cause(failure);
        }
        failure
    }

    #[test]
    fn unwrap_returns_non_wrapper_input() {
        let failure = Failure::new(FailureKind::Server, "plain")
            .with_cause(Failure::new(FailureKind::Io, "below"));
        assert!(unwrap_cause(&failure).ptr_eq(&failure));
    }

    #[test]
    fn unwrap_reaches_root_within_bound() {
        for levels in 0..=MAX_UNWRAP_DEPTH {
            let failure = wrapper_chain(levels);
            let cause = unwrap_cause(&failure);
            assert_eq!(cause.kind(), FailureKind::Io, "levels = {levels}");
            assert_eq!(cause.message(), Some("root"));
        }
    }

    #[test]
    fn unwrap_stops_at_wrapper_without_cause() {
        let failure = Failure::wrap(FailureKind::Execution, Failure::bare(FailureKind::Remote));
        let cause = unwrap_cause(&failure);
        assert_eq!(cause.kind(), FailureKind::Remote);
        assert!(cause.cause().is_none());
    }

    #[test]
    fn unwrap_terminates_on_self_cause() {
        let failure = Failure::new(FailureKind::Remote, "loop");
        failure.init_cause(failure.clone()).unwrap();
        assert!(unwrap_cause(&failure).ptr_eq(&failure));
    }

    #[test]
    #[traced_test]
    fn unwrap_gives_up_after_max_depth() {
        let failure = wrapper_chain(15);
        let cause = unwrap_cause(&failure);
        assert_eq!(cause.message(), Some("wrapper-10"));
        assert!(logs_contain("giving up"));
    }

    #[test]
    #[traced_test]
    fn unwrap_terminates_on_two_node_cycle() {
        let first = Failure::new(FailureKind::Remote, "first");
        let second = Failure::new(FailureKind::Execution, "second");
        first.init_cause(second.clone()).unwrap();
        second.init_cause(first.clone()).unwrap();
        let cause = unwrap_cause(&first);
        assert!(cause.is_wrapper());
        assert!(logs_contain("giving up"));
    }

    #[test]
    fn format_lone_failure() {
        let failure = Failure::new(FailureKind::Io, "disk full");
        assert_eq!(format_chain(Some(&failure)), "IoFailure[disk full]");
    }

    #[test]
    fn format_absent_failure() {
        assert_eq!(format_chain::<Failure>(None), "Unknown");
    }

    #[test]
    fn format_nested_chain() {
        let failure = Failure::new(FailureKind::Server, "search failed").with_cause(
            Failure::bare(FailureKind::Remote).with_cause(Failure::new(FailureKind::Io, "disk full")),
        );
        assert_eq!(
            format_chain(Some(&failure)),
            "ServerFailure[search failed]; nested: RemoteFailure; nested: IoFailure[disk full]"
        );
    }

    #[test]
    fn format_ignores_suppressed() {
        let failure = Failure::new(FailureKind::Server, "main")
            .with_suppressed([Failure::new(FailureKind::Timeout, "other")]);
        assert_eq!(format_chain(Some(&failure)), "ServerFailure[main]");
    }

    #[test]
    #[traced_test]
    fn format_truncates_cycles() {
        let failure = Failure::new(FailureKind::Server, "loop");
        failure.init_cause(failure.clone()).unwrap();
        let summary = format_chain(Some(&failure));
        assert!(summary.ends_with("; nested: ..."));
        assert!(logs_contain("truncating"));
    }

    #[test]
    fn unwrap_matching_walks_causes_only() {
        let corrupt = Failure::new(FailureKind::CorruptData, "checksum mismatch");
        let failure = Failure::wrap(
            FailureKind::Remote,
            Failure::new(FailureKind::Server, "recovery failed").with_cause(corrupt.clone()),
        )
        .with_suppressed([Failure::new(FailureKind::FormatTooOld, "v1 segment")]);

        let found = unwrap_corruption(&failure).unwrap();
        assert!(found.ptr_eq(&corrupt));
        assert!(unwrap_matching(&failure, &[FailureKind::FormatTooOld]).is_none());
    }

    #[test]
    fn unwrap_matching_checks_the_input_itself() {
        let failure = Failure::new(FailureKind::Timeout, "slow");
        let found = unwrap_matching(&failure, &[FailureKind::Timeout, FailureKind::Io]).unwrap();
        assert!(found.ptr_eq(&failure));
    }

    #[test]
    #[traced_test]
    fn unwrap_matching_terminates_on_cycle() {
        let failure = Failure::new(FailureKind::Server, "loop");
        failure.init_cause(failure.clone()).unwrap();
        assert!(unwrap_corruption(&failure).is_none());
        assert!(logs_contain("giving up"));
    }

    #[test]
    fn render_tree_lists_suppressed_and_causes() {
        let failure = Failure::new(FailureKind::Server, "search failed")
            .with_resource("logs")
            .with_suppressed([
                Failure::new(FailureKind::Timeout, "shard 1")
                    .with_cause(Failure::new(FailureKind::Io, "socket closed")),
            ])
            .with_cause(Failure::new(FailureKind::Rejected, "queue full"));

        let expected = "ServerFailure: search failed (resource: logs)\n\
                        \tSuppressed: Timeout: shard 1\n\
                        \tCaused by: IoFailure: socket closed\n\
                        Caused by: Rejected: queue full\n";
        assert_eq!(render_tree(&failure), expected);
    }

    #[test]
    #[traced_test]
    fn render_tree_is_bounded() {
        let failure = Failure::new(FailureKind::Server, "loop");
        failure.init_cause(failure.clone()).unwrap();
        let rendered = render_tree(&failure);
        assert_eq!(rendered.lines().count(), MAX_ITERATIONS + 1);
        assert!(rendered.ends_with("...\n"));
        assert!(logs_contain("truncating"));
    }
}
