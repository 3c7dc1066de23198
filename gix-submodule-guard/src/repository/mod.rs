//! Read-only query facade over the object store.
//!
//! The engine never talks to a concrete backend directly. Everything it needs, commits,
//! tree entries by path, changed paths between two commits and the current reference
//! tips, is expressed by the [`Repository`] trait:
//!
//! - [`gitoxide::GixRepository`] answers queries from a real repository, consulting a push
//!   quarantine first when one is active.
//! - [`memory::MemoryRepository`] is an in-memory fake for tests and experiments.
//!
//! Any id that cannot be resolved yields [`Error::BackendUnavailable`], which callers
//! treat as fatal for the invocation.

use std::collections::BTreeSet;

use bstr::{BStr, BString};
use gix_hash::ObjectId;

use crate::Error;

pub mod gitoxide;
pub mod memory;

/// A commit as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// The commit id.
    pub id: ObjectId,
    /// Parent ids in commit order: none for a root, one for a normal commit, more for merges.
    pub parent_ids: Vec<ObjectId>,
    /// The author identity rendered as `Name <email>`.
    pub author: BString,
    /// The full commit message.
    pub message: BString,
    /// The root tree of the commit.
    pub tree: ObjectId,
    /// Committer time in seconds since the epoch, used to order history traversal.
    pub committer_time: i64,
}

/// How many parents a commit has, which decides how many tree comparisons it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parents<'a> {
    /// A root commit, compared against the empty tree.
    Root,
    /// A regular commit with exactly one parent.
    Single(ObjectId),
    /// A merge commit, compared against each of its parents.
    Merge(&'a [ObjectId]),
}

impl Commit {
    /// Classify the parent list.
    pub fn parents(&self) -> Parents<'_> {
        match self.parent_ids.as_slice() {
            [] => Parents::Root,
            [single] => Parents::Single(*single),
            many => Parents::Merge(many),
        }
    }
}

/// The kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular or executable blob.
    File,
    /// A subtree.
    Directory,
    /// A gitlink pinning a commit of another repository.
    SubmoduleLink,
    /// A symbolic link.
    Symlink,
}

/// An entry of a commit's tree, addressed by its full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// The slash-separated path from the root tree.
    pub path: BString,
    /// The blob, tree or (for submodule links) pinned commit id.
    pub id: ObjectId,
    /// What kind of entry this is.
    pub kind: EntryKind,
}

impl TreeEntry {
    /// Returns true if this entry is a submodule pointer.
    pub fn is_submodule(&self) -> bool {
        self.kind == EntryKind::SubmoduleLink
    }
}

/// A reference and the commit its target peels to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTip {
    /// The fully qualified reference name.
    pub name: String,
    /// The commit the reference points to, with annotated tags peeled.
    pub id: ObjectId,
}

impl ReferenceTip {
    /// Create a new reference tip.
    pub fn new(name: impl Into<String>, id: ObjectId) -> Self {
        Self { name: name.into(), id }
    }
}

/// Read-only queries the engine needs from the version-control backend.
pub trait Repository {
    /// Look up and decode the commit `id`.
    fn find_commit(&self, id: ObjectId) -> Result<Commit, Error>;

    /// Look up the entry at `path` in the tree of `commit`, or `None` if there is none.
    fn tree_entry(&self, commit: ObjectId, path: &BStr) -> Result<Option<TreeEntry>, Error>;

    /// Paths of non-directory entries that differ in kind or id between the trees of
    /// `from` and `to`. `from = None` stands for the empty tree.
    fn changed_paths(&self, from: Option<ObjectId>, to: ObjectId) -> Result<BTreeSet<BString>, Error>;

    /// All references of the repository as they are before the pending update.
    fn reference_tips(&self) -> Result<Vec<ReferenceTip>, Error>;

    /// The parents of `id`, in commit order.
    fn parents(&self, id: ObjectId) -> Result<Vec<Commit>, Error> {
        self.find_commit(id)?
            .parent_ids
            .into_iter()
            .map(|parent| self.find_commit(parent))
            .collect()
    }

    /// The message of commit `id`.
    fn message(&self, id: ObjectId) -> Result<BString, Error> {
        Ok(self.find_commit(id)?.message)
    }
}

impl<R: Repository + ?Sized> Repository for &R {
    fn find_commit(&self, id: ObjectId) -> Result<Commit, Error> {
        (**self).find_commit(id)
    }

    fn tree_entry(&self, commit: ObjectId, path: &BStr) -> Result<Option<TreeEntry>, Error> {
        (**self).tree_entry(commit, path)
    }

    fn changed_paths(&self, from: Option<ObjectId>, to: ObjectId) -> Result<BTreeSet<BString>, Error> {
        (**self).changed_paths(from, to)
    }

    fn reference_tips(&self) -> Result<Vec<ReferenceTip>, Error> {
        (**self).reference_tips()
    }
}
