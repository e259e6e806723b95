//! Escalating fatal failures past a runtime that swallows panics.
//!
//! Async runtimes and network frameworks catch panics raised inside the
//! tasks and callbacks they drive (`tokio::spawn` turns them into a
//! `JoinError`). A fatal failure raised there never reaches the process-wide
//! panic hook. [`escalate_if_fatal`] therefore raises it again on a fresh OS
//! thread that no runtime wraps.
//!
//! Integration contract: the host installs a panic hook that recognises the
//! raised payload (a clone of the fatal node, not wrapped) and decides
//! whether to terminate. With `panic = "abort"` the process aborts right
//! after the hook runs.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tracing::error;

use super::detect::{MAX_ITERATIONS, find_fatal_bounded};
use crate::failure::Chained;
use crate::walker::format_chain;

/// Name of the threads spawned by [`escalate_if_fatal`].
pub const ESCALATION_THREAD_NAME: &str = "fatal-escalation";

/// Re-raises the first fatal failure found in `failure` on a detached thread.
///
/// Does nothing and returns `None` when no fatal node is found. Otherwise the
/// current backtrace is logged, then a new thread is spawned whose only job
/// is to panic with a clone of the fatal node as payload. The thread is
/// spawned even if logging panics; that panic is resumed afterwards.
///
/// The returned handle may be dropped, which detaches the thread. Joining it
/// yields the raised payload as the `Err` variant.
pub fn escalate_if_fatal<F>(failure: &F) -> Option<JoinHandle<()>>
where
    F: Chained + Clone + Send + 'static,
{
    escalate_if_fatal_bounded(failure, MAX_ITERATIONS)
}

/// [`escalate_if_fatal`] with an explicit search budget.
pub fn escalate_if_fatal_bounded<F>(failure: &F, max_iterations: usize) -> Option<JoinHandle<()>>
where
    F: Chained + Clone + Send + 'static,
{
    let fatal = find_fatal_bounded(failure, max_iterations)?.clone();

    let logged = panic::catch_unwind(AssertUnwindSafe(|| log_fatal(&fatal)));
    let handle = raise_detached(fatal);
    if let Err(payload) = logged {
        panic::resume_unwind(payload);
    }
    Some(handle)
}

fn log_fatal<F: Chained>(fatal: &F) {
    let backtrace = Backtrace::force_capture();
    error!(fatal = %format_chain(Some(fatal)), "fatal failure\n{backtrace}");
}

fn raise_detached<F: Any + Send>(fatal: F) -> JoinHandle<()> {
    let spawned: std::io::Result<JoinHandle<()>> = thread::Builder::new()
        .name(ESCALATION_THREAD_NAME.to_owned())
        .spawn(move || panic::panic_any(fatal));
    match spawned {
        Ok(handle) => handle,
        Err(err) => {
            // No thread means no way past the host; a fatal failure must not be dropped.
            error!(%err, "failed to spawn fatal escalation thread, aborting");
            std::process::abort();
        }
    }
}
