/*!
Decision engine for a server-side `update` hook guarding submodule pointers.

The hook runs once per reference update during a push. It rejects the update unless every
newly introduced commit that changes a submodule pointer (a gitlink tree entry) mentions
the change in its commit message.

Pipeline
- [`transition`]: classify `<refname> <old> <new>` into create, update or delete.
- [`walk`]: enumerate the commits reachable from the new tip which no existing reference
  could already reach.
- [`submodule`]: find the gitlink paths each of those commits changes, per parent edge.
- [`policy`]: check the messages of offending commits and aggregate a [`Verdict`].

All object access goes through the [`Repository`] trait so the engine runs against
the real object store ([`repository::gitoxide::GixRepository`]) as well as against an
in-memory fake ([`repository::memory::MemoryRepository`]).

Design principles
- Read-only: nothing is written, locked or cached across invocations.
- Bounded: history traversal uses explicit worklists, never recursion.
- Fail closed: a transition that cannot be verified is rejected.
*/

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod config;
pub mod guard;
pub mod policy;
pub mod repository;
pub mod submodule;
pub mod transition;
pub mod walk;

pub use config::GuardConfig;
pub use guard::Guard;
pub use policy::{Keyword, Verdict, Violation};
pub use repository::{Commit, EntryKind, ReferenceTip, Repository, TreeEntry};
pub use transition::RefTransition;

use gix_hash::ObjectId;

/// Stable high-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// The hook was invoked with arguments that do not describe a reference transition.
    Invocation,
    /// The object store could not answer a query.
    Backend,
    /// Configuration values are present but invalid.
    Config,
    /// I/O errors from filesystem or OS interactions.
    Io,
}

/// Error type for operations provided by this crate.
///
/// Every variant is fatal for the current invocation: callers must reject the transition.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Old or new identifiers are neither valid hex object ids nor the zero sentinel.
    #[error("malformed invocation: {0}")]
    MalformedInvocation(String),
    /// A required commit or tree could not be resolved.
    #[error("object {id} is unavailable: {message}")]
    BackendUnavailable { id: ObjectId, message: String },
    /// A repository-level operation failed that is not tied to a single object.
    #[error("repository access failed: {0}")]
    Repository(String),
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
    /// I/O errors from filesystem or OS interactions.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fast classification helper returning a stable error kind.
    pub fn kind(&self) -> Kind {
        match self {
            Error::MalformedInvocation(_) => Kind::Invocation,
            Error::BackendUnavailable { .. } | Error::Repository(_) => Kind::Backend,
            Error::Config(_) => Kind::Config,
            Error::Io(_) => Kind::Io,
        }
    }

    pub(crate) fn unavailable(id: ObjectId, message: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            id,
            message: message.into(),
        }
    }
}
