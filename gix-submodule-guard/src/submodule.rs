//! Detection of submodule pointer changes.
//!
//! A commit changes a submodule if, against any of its parents, a path that is a gitlink on
//! at least one side differs. Adding, removing and retargeting a gitlink all count, as
//! does turning a file or directory into a gitlink and back. Root commits are compared
//! against the empty tree.

use std::collections::BTreeSet;

use bstr::{BString, ByteSlice};
use gix_hash::ObjectId;

use crate::repository::Parents;
use crate::{Commit, Error, Repository, TreeEntry};

/// A changed submodule pointer between a commit and one of its parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleChange {
    /// The path of the gitlink.
    pub path: BString,
    /// The commit pinned by the parent, if the parent had a gitlink at `path`.
    pub old_pointer: Option<ObjectId>,
    /// The commit pinned by the commit itself, if it has a gitlink at `path`.
    pub new_pointer: Option<ObjectId>,
}

/// Submodule changes of `commit` relative to `parent`, or to the empty tree if there is none.
pub fn submodule_changes<R: Repository>(
    repo: &R,
    parent: Option<ObjectId>,
    commit: ObjectId,
) -> Result<Vec<SubmoduleChange>, Error> {
    let mut changes = Vec::new();
    for path in repo.changed_paths(parent, commit)? {
        let old = match parent {
            Some(parent) => repo.tree_entry(parent, path.as_bstr())?,
            None => None,
        };
        let new = repo.tree_entry(commit, path.as_bstr())?;
        if !is_gitlink(&old) && !is_gitlink(&new) {
            continue;
        }
        changes.push(SubmoduleChange {
            old_pointer: pointer(old),
            new_pointer: pointer(new),
            path,
        });
    }
    Ok(changes)
}

/// The union of submodule paths `commit` changes across all of its parent edges.
pub fn changed_submodule_paths<R: Repository>(repo: &R, commit: &Commit) -> Result<BTreeSet<BString>, Error> {
    let edges: Vec<Option<ObjectId>> = match commit.parents() {
        Parents::Root => vec![None],
        Parents::Single(parent) => vec![Some(parent)],
        Parents::Merge(parents) => parents.iter().copied().map(Some).collect(),
    };

    let mut paths = BTreeSet::new();
    for parent in edges {
        for change in submodule_changes(repo, parent, commit.id)? {
            tracing::trace!(
                commit = %commit.id,
                path = %change.path,
                old = ?change.old_pointer,
                new = ?change.new_pointer,
                "submodule pointer changed"
            );
            paths.insert(change.path);
        }
    }
    Ok(paths)
}

fn is_gitlink(entry: &Option<TreeEntry>) -> bool {
    entry.as_ref().is_some_and(TreeEntry::is_submodule)
}

fn pointer(entry: Option<TreeEntry>) -> Option<ObjectId> {
    entry.filter(TreeEntry::is_submodule).map(|entry| entry.id)
}

/// Render a set of paths for log output.
pub(crate) fn display_paths(paths: &BTreeSet<BString>) -> String {
    paths.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
