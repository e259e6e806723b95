//! Bounded breadth-first search for fatal failures.

use std::collections::VecDeque;

use tracing::warn;

use crate::failure::Chained;
use crate::walker::format_chain;

/// Maximum number of nodes a graph search visits before giving up.
pub const MAX_ITERATIONS: usize = 1024;

/// Looks for a fatal failure in the graph rooted at `root`.
///
/// Returns `root` itself when it is fatal. Otherwise walks the graph breadth
/// first, visiting the suppressed companions of each node (in order) before
/// its cause, so shallower fatal nodes win over deeper ones.
///
/// Nodes are not deduplicated: the [`MAX_ITERATIONS`] budget is the only
/// protection against cycles and fan-out. Once it is spent a warning is
/// logged and `None` is returned.
#[must_use]
pub fn find_fatal<F: Chained>(root: &F) -> Option<&F> {
    find_fatal_bounded(root, MAX_ITERATIONS)
}

/// [`find_fatal`] with an explicit iteration budget.
#[must_use]
pub fn find_fatal_bounded<F: Chained>(root: &F, max_iterations: usize) -> Option<&F> {
    if root.is_fatal() {
        return Some(root);
    }

    let mut queue = VecDeque::from([root]);
    let mut iterations = 0;
    while let Some(current) = queue.pop_front() {
        iterations += 1;
        if iterations > max_iterations {
            warn!(
                max_iterations,
                root = %format_chain(Some(root)),
                "giving up looking for fatal failures"
            );
            return None;
        }
        if current.is_fatal() {
            return Some(current);
        }
        queue.extend(current.suppressed());
        if let Some(cause) = current.cause() {
            queue.push_back(cause);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{Failure, FailureKind};
    use tracing_test::traced_test;

    #[test]
    fn fatal_root_short_circuits() {
        let failure = Failure::new(FailureKind::OutOfMemory, "heap")
            .with_cause(Failure::new(FailureKind::StackOverflow, "deeper"));
        assert!(find_fatal(&failure).unwrap().ptr_eq(&failure));
    }

    #[test]
    fn fatal_root_ignores_budget() {
        let failure = Failure::new(FailureKind::Assertion, "broken invariant");
        assert!(find_fatal_bounded(&failure, 0).unwrap().ptr_eq(&failure));
    }

    #[test]
    fn no_fatal_in_graph() {
        let failure = Failure::new(FailureKind::Server, "search failed")
            .with_suppressed([Failure::new(FailureKind::Timeout, "shard 1")])
            .with_cause(Failure::new(FailureKind::Io, "disk full"));
        assert!(find_fatal(&failure).is_none());
    }

    #[test]
    fn finds_fatal_three_suppressed_hops_deep() {
        let fatal = Failure::new(FailureKind::OutOfMemory, "heap");
        let failure = Failure::new(FailureKind::Server, "level 0").with_suppressed([
            Failure::new(FailureKind::Server, "level 1").with_suppressed([
                Failure::new(FailureKind::Server, "level 2").with_suppressed([fatal.clone()]),
            ]),
        ]);
        assert!(find_fatal(&failure).unwrap().ptr_eq(&fatal));
    }

    #[test]
    fn finds_fatal_under_wrappers() {
        let fatal = Failure::new(FailureKind::Internal, "runtime");
        let failure = Failure::wrap(
            FailureKind::Remote,
            Failure::wrap(FailureKind::Execution, fatal.clone()),
        );
        assert!(find_fatal(&failure).unwrap().ptr_eq(&fatal));
    }

    #[test]
    fn shallow_suppressed_wins_over_deep_cause() {
        let deep = Failure::new(FailureKind::StackOverflow, "deep");
        let shallow = Failure::new(FailureKind::OutOfMemory, "shallow");
        let failure = Failure::new(FailureKind::Server, "top")
            .with_cause(Failure::new(FailureKind::Server, "middle").with_cause(deep))
            .with_suppressed([
                Failure::new(FailureKind::Timeout, "t").with_suppressed([shallow.clone()])
            ]);
        assert!(find_fatal(&failure).unwrap().ptr_eq(&shallow));
    }

    #[test]
    fn suppressed_before_cause_on_same_level() {
        let in_cause = Failure::new(FailureKind::StackOverflow, "cause");
        let in_suppressed = Failure::new(FailureKind::OutOfMemory, "suppressed");
        let failure = Failure::new(FailureKind::Server, "top")
            .with_cause(in_cause)
            .with_suppressed([in_suppressed.clone()]);
        assert!(find_fatal(&failure).unwrap().ptr_eq(&in_suppressed));
    }

    #[test]
    #[traced_test]
    fn gives_up_on_cycle() {
        let failure = Failure::new(FailureKind::Server, "loop");
        failure.init_cause(failure.clone()).unwrap();
        assert!(find_fatal(&failure).is_none());
        assert!(logs_contain("giving up looking for fatal failures"));
    }

    #[test]
    #[traced_test]
    fn gives_up_on_fan_out_beyond_budget() {
        let fatal = Failure::new(FailureKind::OutOfMemory, "too far");
        let noise =
            (0..MAX_ITERATIONS).map(|i| Failure::new(FailureKind::Timeout, format!("shard {i}")));
        let failure = Failure::new(FailureKind::Server, "fan-out")
            .with_suppressed(noise)
            .with_cause(fatal);
        assert!(find_fatal(&failure).is_none());
        assert!(logs_contain("giving up looking for fatal failures"));
    }

    #[test]
    fn finds_fatal_at_edge_of_budget() {
        let fatal = Failure::new(FailureKind::OutOfMemory, "last");
        let noise = (0..MAX_ITERATIONS - 2)
            .map(|i| Failure::new(FailureKind::Timeout, format!("shard {i}")));
        let failure = Failure::new(FailureKind::Server, "fan-out")
            .with_suppressed(noise)
            .with_cause(fatal.clone());
        assert!(find_fatal(&failure).unwrap().ptr_eq(&fatal));
    }
}
