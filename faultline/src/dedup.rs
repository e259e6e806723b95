//! Deduplicating per-resource failure reports.
//!
//! A fan-out across many resources often fails the same way everywhere.
//! [`deduplicate`] keeps one report per distinct cause, identified by its
//! [`GroupKey`].

use std::collections::HashSet;

use crate::failure::Chained;
use crate::walker::format_chain;

/// One failure reported by a fan-out operation for a single resource.
#[derive(Debug, Clone)]
pub struct FailureReport<F> {
    resource: Option<String>,
    message: String,
    cause: F,
}

impl<F: Chained> FailureReport<F> {
    /// Creates a report whose message summarises the cause chain.
    #[must_use]
    pub fn new(resource: Option<String>, cause: F) -> Self {
        let message = format_chain(Some(&cause));
        Self {
            resource,
            message,
            cause,
        }
    }

    /// Replaces the report message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns the resource the report is about.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Returns the report message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the failure behind the report.
    #[must_use]
    pub const fn cause(&self) -> &F {
        &self.cause
    }

    /// Returns the deduplication identity of this report.
    #[must_use]
    pub fn group_key(&self) -> GroupKey<'_, F::Kind> {
        GroupKey::of(&self.cause)
    }
}

/// Identity of a failure for deduplication: message, resource, kind.
///
/// Absent fields are equal to each other and never equal to a present one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey<'a, K> {
    /// Message of the failure.
    pub message: Option<&'a str>,
    /// Resource the failure carries, if any.
    pub resource: Option<&'a str>,
    /// Kind tag of the failure.
    pub kind: K,
}

impl<'a, K> GroupKey<'a, K> {
    /// Derives the key of `failure`.
    #[must_use]
    pub fn of<F: Chained<Kind = K>>(failure: &'a F) -> Self {
        Self {
            message: failure.message(),
            resource: failure.resource(),
            kind: failure.kind(),
        }
    }
}

/// Keeps the first report for every distinct [`GroupKey`].
///
/// Kept reports stay in their original relative order.
#[must_use]
pub fn deduplicate<F: Chained>(reports: Vec<FailureReport<F>>) -> Vec<FailureReport<F>> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(reports.len());
        reports
            .iter()
            .map(|report| seen.insert(report.group_key()))
            .collect()
    };
    reports
        .into_iter()
        .zip(keep)
        .filter_map(|(report, keep)| keep.then_some(report))
        .collect()
}
