//! The message rule for commits that change submodule pointers.
//!
//! A commit is only subject to the rule if it changes at least one submodule pointer.
//! Such a commit passes if its message contains the [`Keyword`], compared
//! case-insensitively. Each failing commit becomes a [`Violation`]; any violation turns
//! the [`Verdict`] of the whole reference transition into a rejection.

use std::collections::BTreeSet;

use bstr::{BString, ByteSlice};

use crate::Commit;

pub mod keyword;
pub mod verdict;

pub use keyword::Keyword;
pub use verdict::{Verdict, Violation};

/// Check `commit`, which changes the submodule pointers at `changed_paths`.
///
/// Commits that change no submodule pointer never violate the rule, whatever their message.
pub fn check(keyword: &Keyword, commit: Commit, changed_paths: BTreeSet<BString>) -> Option<Violation> {
    if changed_paths.is_empty() || keyword.is_mentioned_in(commit.message.as_bstr()) {
        return None;
    }
    Some(Violation { commit, changed_paths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gix_hash::ObjectId;

    fn commit(message: &str) -> Commit {
        Commit {
            id: ObjectId::Sha1([1; 20]),
            parent_ids: Vec::new(),
            author: "A U Thor <author@example.com>".into(),
            message: message.into(),
            tree: ObjectId::Sha1([2; 20]),
            committer_time: 0,
        }
    }

    fn paths(paths: &[&str]) -> BTreeSet<BString> {
        paths.iter().map(|p| BString::from(*p)).collect()
    }

    #[test]
    fn commits_without_submodule_changes_always_pass() {
        let keyword = Keyword::default();
        assert!(check(&keyword, commit("Added todo to readme file"), paths(&[])).is_none());
    }

    #[test]
    fn mentioning_the_keyword_passes() {
        let keyword = Keyword::default();
        assert!(check(&keyword, commit("Added library as submodule"), paths(&["lib/library"])).is_none());
        assert!(check(&keyword, commit("Bump SubModule to v2"), paths(&["lib/library"])).is_none());
    }

    #[test]
    fn silent_submodule_changes_are_violations() {
        let keyword = Keyword::default();
        let violation = check(&keyword, commit("Added todo to readme file"), paths(&["lib/library"]))
            .expect("violation");
        assert_eq!(violation.changed_paths, paths(&["lib/library"]));
        assert_eq!(violation.commit.message, "Added todo to readme file");
    }
}
