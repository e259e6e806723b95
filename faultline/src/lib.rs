//! Failure chain inspection and escalation primitives for long-running
//! servers.
//!
//! Subsystems use this crate to:
//!
//! - walk a failure's cause chain past pure wrappers ([`walker`]),
//! - find a fatal failure buried under wrappers or suppressed companions
//!   and escalate it past a runtime that swallows panics ([`fatal`]),
//! - merge the failures of a fan-out into one ([`merge`]),
//! - deduplicate per-resource failure reports ([`dedup`]).
//!
//! Everything operates on the [`Chained`] contract; [`Failure`] is the
//! ready-made node type. Failure graphs may be cyclic, so every traversal
//! is bounded ([`Limits`]) and logs a warning through `tracing` when a bound
//! is hit instead of failing.
//!
//! ```
//! use faultline::{Failure, FailureKind, find_fatal, format_chain, unwrap_cause};
//!
//! let root = Failure::new(FailureKind::Io, "disk full");
//! let failure = Failure::wrap(FailureKind::Remote, root.clone());
//!
//! assert!(unwrap_cause(&failure).ptr_eq(&root));
//! assert_eq!(format_chain(Some(&root)), "IoFailure[disk full]");
//! assert!(find_fatal(&failure).is_none());
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod failure;
pub mod fatal;
pub mod merge;
pub mod snapshot;
pub mod walker;

pub use config::{Config, Limits};
pub use dedup::{FailureReport, GroupKey, deduplicate};
pub use error::Error;
pub use failure::{Chained, Failure, FailureKind, Merge};
pub use fatal::{escalate_if_fatal, find_fatal};
pub use merge::{rethrow_as_unrecoverable, rethrow_first_with_rest_suppressed};
pub use walker::{format_chain, unwrap_cause, unwrap_matching};
