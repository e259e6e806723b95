//! Merging the failures of a fan-out operation into one.
//!
//! A fan-out can only hand one failure back to its caller. The first failure
//! becomes the main one and every other is attached to it as a suppressed
//! companion, so nothing is lost. "Raising" is returning it as `Err`.

use crate::failure::Merge;

/// Folds one more failure into the running main failure.
///
/// Returns `next` when there is no main failure yet, otherwise `main` with
/// `next` attached as a suppressed companion.
#[must_use]
pub fn use_or_suppress<F: Merge>(main: Option<F>, next: F) -> F {
    match main {
        Some(main) => main.suppress(next),
        None => next,
    }
}

fn fold<F: Merge + Clone>(failures: &[F]) -> Option<F> {
    failures
        .iter()
        .cloned()
        .fold(None, |main, next| Some(use_or_suppress(main, next)))
}

/// Returns the first failure with all others suppressed under it.
///
/// An empty slice is `Ok(())`. A single failure comes back as it was. The
/// input is not modified; attaching companions builds a new main failure.
///
/// # Errors
///
/// Returns the merged failure whenever `failures` is not empty.
pub fn rethrow_first_with_rest_suppressed<F: Merge + Clone>(failures: &[F]) -> Result<(), F> {
    fold(failures).map_or(Ok(()), Err)
}

/// Like [`rethrow_first_with_rest_suppressed`], but always wraps the merged
/// failure as unrecoverable, so callers see one uniform kind.
///
/// # Errors
///
/// Returns the wrapped failure whenever `failures` is not empty.
pub fn rethrow_as_unrecoverable<F: Merge + Clone>(failures: &[F]) -> Result<(), F> {
    fold(failures).map_or(Ok(()), |main| Err(main.into_unrecoverable()))
}
