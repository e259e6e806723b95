//! Finding fatal failures and escalating them past the hosting runtime.
//!
//! - [`detect`] — bounded breadth-first search for a fatal node.
//! - [`escalate`] — re-raise a fatal node on a detached thread.

mod detect;
mod escalate;

pub use self::detect::*;
pub use self::escalate::*;
