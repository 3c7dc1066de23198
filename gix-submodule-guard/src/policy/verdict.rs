//! The outcome of evaluating a reference transition.

use std::collections::BTreeSet;
use std::fmt;

use bstr::BString;

use crate::Commit;

/// A newly introduced commit that changes submodule pointers without saying so.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The offending commit.
    pub commit: Commit,
    /// The submodule paths it changes, across all parent edges.
    pub changed_paths: BTreeSet<BString>,
}

/// Renders the diagnostic line reported to the pusher.
///
/// The wording is matched verbatim by tooling on the client side and must not change.
impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Commit {} by {} touches a submodule, but does not mention it in the commit message",
            self.commit.id, self.commit.author
        )
    }
}

/// Whether a reference transition may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No introduced commit violates the rule.
    Accept,
    /// At least one introduced commit violates the rule, in enumeration order.
    Reject(Vec<Violation>),
}

impl Verdict {
    /// Accept if `violations` is empty, reject otherwise.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Verdict::Accept
        } else {
            Verdict::Reject(violations)
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    /// The violations behind a rejection, empty when accepted.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Verdict::Accept => &[],
            Verdict::Reject(violations) => violations,
        }
    }
}
