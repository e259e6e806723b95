//! The failure chain model.
//!
//! Every traversal in this crate is written against two small contracts:
//!
//! - [`Chained`] — read access to a failure node: kind tag, message, cause
//!   link, suppressed companions and the wrapper/fatal capability flags.
//! - [`Merge`] — building a new failure from existing ones (attaching
//!   suppressed companions, wrapping as unrecoverable).
//!
//! [`Failure`] is the shared, reference-counted node shipped with the crate,
//! tagged with the closed [`FailureKind`] enumeration. Cause links may point
//! back into their own ancestry, so nothing here assumes the graph is acyclic.

use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fatal::MAX_ITERATIONS;
use crate::walker::causes;

/// Read access to one node of a failure graph.
///
/// The cause link is a single edge that may form a cycle; the suppressed
/// list is an independent fan-out of companion failures.
pub trait Chained: Sized {
    /// Stable tag identifying the concrete kind of failure.
    type Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display;

    /// Returns the kind tag of this node.
    fn kind(&self) -> Self::Kind;

    /// Returns the message, if any.
    fn message(&self) -> Option<&str>;

    /// Returns the failure that caused this one, if any.
    fn cause(&self) -> Option<&Self>;

    /// Returns the suppressed companions, in the order they were attached.
    fn suppressed(&self) -> &[Self];

    /// Returns the identifier of the resource the failure is about.
    fn resource(&self) -> Option<&str> {
        None
    }

    /// Whether this node only carries its cause across a boundary.
    fn is_wrapper(&self) -> bool;

    /// Whether this node signals that process invariants may be broken.
    fn is_fatal(&self) -> bool;

    /// Whether `self` and `other` are the same node.
    fn is_same(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

/// Building new failures out of existing ones.
///
/// Implementations must not mutate a node visible to other owners; a node
/// shared elsewhere is copied before it is extended.
pub trait Merge: Chained {
    /// Returns `self` with `companion` appended to its suppressed list.
    #[must_use]
    fn suppress(self, companion: Self) -> Self;

    /// Wraps `self` as the cause of a generic unrecoverable failure.
    #[must_use]
    fn into_unrecoverable(self) -> Self;
}

/// The closed set of failure kinds understood by [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// General server-side failure.
    Server,
    /// Generic wrapper produced when a batch of failures is merged.
    Unrecoverable,
    /// Failure relayed from a remote node; a pure wrapper.
    Remote,
    /// Failure relayed from another execution context; a pure wrapper.
    Execution,
    /// A caller-supplied argument was rejected.
    InvalidArgument,
    /// Work was rejected because an executor is saturated.
    Rejected,
    /// An operation ran out of time.
    Timeout,
    /// A referenced resource does not exist.
    NotFound,
    /// Input/output failure.
    Io,
    /// Stored data failed its integrity check.
    CorruptData,
    /// Stored data was written by a format version that is no longer read.
    FormatTooOld,
    /// Stored data was written by a newer format version.
    FormatTooNew,
    /// Memory could not be allocated.
    OutOfMemory,
    /// The call stack was exhausted.
    StackOverflow,
    /// An internal invariant check failed.
    Assertion,
    /// The runtime itself failed.
    Internal,
}

impl FailureKind {
    /// Kinds that signal stored data can no longer be trusted.
    pub const CORRUPTION: [Self; 3] = [Self::CorruptData, Self::FormatTooOld, Self::FormatTooNew];

    /// Returns the short name used in rendered chains.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Server => "ServerFailure",
            Self::Unrecoverable => "UnrecoverableFailure",
            Self::Remote => "RemoteFailure",
            Self::Execution => "ExecutionFailure",
            Self::InvalidArgument => "InvalidArgument",
            Self::Rejected => "Rejected",
            Self::Timeout => "Timeout",
            Self::NotFound => "NotFound",
            Self::Io => "IoFailure",
            Self::CorruptData => "CorruptData",
            Self::FormatTooOld => "FormatTooOld",
            Self::FormatTooNew => "FormatTooNew",
            Self::OutOfMemory => "OutOfMemory",
            Self::StackOverflow => "StackOverflow",
            Self::Assertion => "AssertionFailure",
            Self::Internal => "InternalFailure",
        }
    }

    /// Returns `true` for kinds that exist only to carry a cause.
    #[must_use]
    pub const fn is_wrapper(self) -> bool {
        matches!(self, Self::Remote | Self::Execution)
    }

    /// Returns `true` for kinds after which continued operation is unsafe.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::OutOfMemory | Self::StackOverflow | Self::Assertion | Self::Internal
        )
    }

    /// Returns `true` for the data-corruption kinds.
    #[must_use]
    pub const fn is_corruption(self) -> bool {
        matches!(
            self,
            Self::CorruptData | Self::FormatTooOld | Self::FormatTooNew
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A shared failure node.
///
/// Cloning is cheap and yields a handle to the same node. Builder methods
/// are copy-on-write: extending a node that is shared with other handles
/// produces a fresh node and leaves the shared one untouched.
///
/// Cyclic cause links can only be created through [`Failure::init_cause`];
/// such graphs keep themselves alive.
#[derive(Clone)]
pub struct Failure(Arc<Inner>);

#[derive(Clone)]
struct Inner {
    kind: FailureKind,
    message: Option<String>,
    resource: Option<String>,
    cause: OnceLock<Failure>,
    suppressed: Vec<Failure>,
}

impl Failure {
    /// Creates a failure of `kind` with a message.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::build(kind, Some(message.into()))
    }

    /// Creates a failure of `kind` without a message.
    #[must_use]
    pub fn bare(kind: FailureKind) -> Self {
        Self::build(kind, None)
    }

    /// Creates a failure of `kind` whose cause is `cause`.
    ///
    /// The message is inherited from the cause, the way wrappers usually
    /// report what they carry.
    #[must_use]
    pub fn wrap(kind: FailureKind, cause: Self) -> Self {
        let message = cause.message().map(ToOwned::to_owned);
        Self::build(kind, message).with_cause(cause)
    }

    /// Converts a foreign error and its `source()` chain into a failure chain.
    ///
    /// The outermost error becomes a node of `kind`; each source below it
    /// becomes a cause node keeping the source's message, tagged
    /// [`FailureKind::Io`] for [`io::Error`] and [`FailureKind::Server`]
    /// otherwise. A [`Failure`] met along the way is linked as is and ends
    /// the walk, so an error that already is a [`Failure`] is returned
    /// unchanged.
    ///
    /// At most [`MAX_ITERATIONS`] nodes are converted; a longer source chain
    /// is truncated with a warning.
    #[must_use]
    pub fn from_error(kind: FailureKind, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut converted = Vec::new();
        let mut tail = None;
        let mut next = Some(error);
        while let Some(current) = next {
            if let Some(failure) = current.downcast_ref::<Self>() {
                tail = Some(failure.clone());
                break;
            }
            if converted.len() == MAX_ITERATIONS {
                warn!(
                    limit = MAX_ITERATIONS,
                    %kind,
                    "error source chain too long to convert, truncating"
                );
                break;
            }
            let node_kind = if converted.is_empty() {
                kind
            } else if current.is::<io::Error>() {
                FailureKind::Io
            } else {
                FailureKind::Server
            };
            converted.push(Self::new(node_kind, current.to_string()));
            next = current.source();
        }

        converted
            .into_iter()
            .rev()
            .fold(tail, |cause, node| {
                Some(match cause {
                    Some(cause) => node.with_cause(cause),
                    None => node,
                })
            })
            .unwrap_or_else(|| Self::bare(kind))
    }

    fn build(kind: FailureKind, message: Option<String>) -> Self {
        Self(Arc::new(Inner {
            kind,
            message,
            resource: None,
            cause: OnceLock::new(),
            suppressed: Vec::new(),
        }))
    }

    /// Sets the resource identifier.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.0).resource = Some(resource.into());
        self
    }

    /// Sets the cause, replacing any previous one.
    #[must_use]
    pub fn with_cause(mut self, cause: Self) -> Self {
        Arc::make_mut(&mut self.0).cause = OnceLock::from(cause);
        self
    }

    /// Appends suppressed companions.
    #[must_use]
    pub fn with_suppressed(mut self, companions: impl IntoIterator<Item = Self>) -> Self {
        Arc::make_mut(&mut self.0).suppressed.extend(companions);
        self
    }

    /// Sets the cause of an already shared node.
    ///
    /// The link can be set once; this is what allows a cause to point back
    /// into its own ancestry.
    ///
    /// # Errors
    ///
    /// Returns `cause` back if this node already has one.
    pub fn init_cause(&self, cause: Self) -> Result<(), Self> {
        self.0.cause.set(cause)
    }

    /// Returns `true` if both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Chained for Failure {
    type Kind = FailureKind;

    fn kind(&self) -> FailureKind {
        self.0.kind
    }

    fn message(&self) -> Option<&str> {
        self.0.message.as_deref()
    }

    fn cause(&self) -> Option<&Self> {
        self.0.cause.get()
    }

    fn suppressed(&self) -> &[Self] {
        &self.0.suppressed
    }

    fn resource(&self) -> Option<&str> {
        self.0.resource.as_deref()
    }

    fn is_wrapper(&self) -> bool {
        self.0.kind.is_wrapper()
    }

    fn is_fatal(&self) -> bool {
        self.0.kind.is_fatal()
    }

    fn is_same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Merge for Failure {
    fn suppress(self, companion: Self) -> Self {
        self.with_suppressed([companion])
    }

    fn into_unrecoverable(self) -> Self {
        let message = match self.message() {
            Some(message) => format!("{}: {message}", self.kind()),
            None => self.kind().to_string(),
        };
        Self::new(FailureKind::Unrecoverable, message).with_cause(self)
    }
}

// Only the immediate node is printed: the cause link may be cyclic.
impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.0.kind)
            .field("message", &self.0.message)
            .field("resource", &self.0.resource)
            .field("has_cause", &self.cause().is_some())
            .field("suppressed", &self.0.suppressed.len())
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {message}", self.kind()),
            None => write!(f, "{}", self.kind()),
        }
    }
}

// Generic `source()` walkers carry no bound: a node whose cause chain does
// not end within `MAX_ITERATIONS` links reports no source at all.
impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let cause = Chained::cause(self)?;
        if causes(self).nth(MAX_ITERATIONS).is_some() {
            return None;
        }
        Some(cause)
    }
}
