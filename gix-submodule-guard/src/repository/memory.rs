//! An in-memory [`Repository`] for tests.
//!
//! Trees are stored flat, as a map from full path to entry, and object ids are made up
//! from a counter. Committer times increase with every commit unless given explicitly,
//! so later commits are newer just like in a real history.
//!
//! ```
//! use gix_submodule_guard::repository::memory::{MemoryRepository, MemoryTree};
//! use gix_submodule_guard::Repository;
//!
//! let mut repo = MemoryRepository::new();
//! let root = repo.commit(&[], "initial commit", MemoryTree::new().file("README.txt", "Hello world!"));
//! repo.set_reference("refs/heads/master", root);
//!
//! assert_eq!(repo.message(root).unwrap(), "initial commit");
//! assert_eq!(repo.reference_tips().unwrap().len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bstr::{BStr, BString, ByteSlice};
use gix_hash::ObjectId;

use super::{Commit, EntryKind, ReferenceTip, Repository, TreeEntry};
use crate::Error;

/// The author used by [`MemoryRepository::commit()`].
pub const DEFAULT_AUTHOR: &str = "A U Thor <author@example.com>";

/// A flat tree: full path to kind and id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTree {
    entries: BTreeMap<BString, (EntryKind, ObjectId)>,
}

impl MemoryTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a regular file whose id is derived from `content`.
    pub fn file(self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.entry(path, EntryKind::File, content_id(content.as_ref()))
    }

    /// Add or replace a symbolic link pointing to `target`.
    pub fn symlink(self, path: &str, target: &str) -> Self {
        self.entry(path, EntryKind::Symlink, content_id(target.as_bytes()))
    }

    /// Add or replace a submodule link pinning `commit`.
    pub fn submodule(self, path: &str, commit: ObjectId) -> Self {
        self.entry(path, EntryKind::SubmoduleLink, commit)
    }

    /// Remove the entry at `path`.
    pub fn remove(mut self, path: &str) -> Self {
        self.entries.remove(path.as_bytes().as_bstr());
        self
    }

    fn entry(mut self, path: &str, kind: EntryKind, id: ObjectId) -> Self {
        self.entries.insert(path.into(), (kind, id));
        self
    }

    fn lookup(&self, path: &BStr) -> Option<TreeEntry> {
        if let Some((kind, id)) = self.entries.get(path) {
            return Some(TreeEntry {
                path: path.to_owned(),
                id: *id,
                kind: *kind,
            });
        }
        let mut prefix = path.to_owned();
        prefix.push(b'/');
        let is_directory = self
            .entries
            .range::<BStr, _>((std::ops::Bound::Included(prefix.as_bstr()), std::ops::Bound::Unbounded))
            .next()
            .is_some_and(|(candidate, _)| candidate.starts_with(prefix.as_slice()));
        is_directory.then(|| TreeEntry {
            path: path.to_owned(),
            id: content_id(&prefix),
            kind: EntryKind::Directory,
        })
    }
}

struct Stored {
    commit: Commit,
    tree: MemoryTree,
}

/// An in-memory commit graph with flat trees and a reference namespace.
#[derive(Default)]
pub struct MemoryRepository {
    commits: HashMap<ObjectId, Stored>,
    references: BTreeMap<String, ObjectId>,
    next_id: u32,
    clock: i64,
}

impl MemoryRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a commit by [`DEFAULT_AUTHOR`] with the next committer time.
    pub fn commit(&mut self, parents: &[ObjectId], message: &str, tree: MemoryTree) -> ObjectId {
        let time = self.clock + 1;
        self.commit_with(parents, message, DEFAULT_AUTHOR, time, tree)
    }

    /// Create a commit with explicit author identity and committer time.
    pub fn commit_with(
        &mut self,
        parents: &[ObjectId],
        message: &str,
        author: &str,
        committer_time: i64,
        tree: MemoryTree,
    ) -> ObjectId {
        let id = self.allocate_id(0xc0);
        let tree_id = self.allocate_id(0x7e);
        self.clock = self.clock.max(committer_time);
        let commit = Commit {
            id,
            parent_ids: parents.to_vec(),
            author: author.into(),
            message: message.into(),
            tree: tree_id,
            committer_time,
        };
        self.commits.insert(id, Stored { commit, tree });
        id
    }

    /// The tree of `commit`, for deriving the tree of a child commit.
    pub fn tree(&self, commit: ObjectId) -> Option<MemoryTree> {
        self.commits.get(&commit).map(|stored| stored.tree.clone())
    }

    /// Point the reference `name` at `id`, creating it if needed.
    pub fn set_reference(&mut self, name: &str, id: ObjectId) {
        self.references.insert(name.to_owned(), id);
    }

    /// Delete the reference `name`.
    pub fn remove_reference(&mut self, name: &str) {
        self.references.remove(name);
    }

    /// Drop a commit from the store as if it had been garbage-collected.
    pub fn forget(&mut self, id: ObjectId) {
        self.commits.remove(&id);
    }

    fn allocate_id(&mut self, tag: u8) -> ObjectId {
        self.next_id += 1;
        let mut bytes = [0u8; 20];
        bytes[0] = tag;
        bytes[16..].copy_from_slice(&self.next_id.to_be_bytes());
        ObjectId::Sha1(bytes)
    }

    fn stored(&self, id: ObjectId) -> Result<&Stored, Error> {
        self.commits
            .get(&id)
            .ok_or_else(|| Error::unavailable(id, "object not found"))
    }
}

impl Repository for MemoryRepository {
    fn find_commit(&self, id: ObjectId) -> Result<Commit, Error> {
        Ok(self.stored(id)?.commit.clone())
    }

    fn tree_entry(&self, commit: ObjectId, path: &BStr) -> Result<Option<TreeEntry>, Error> {
        Ok(self.stored(commit)?.tree.lookup(path))
    }

    fn changed_paths(&self, from: Option<ObjectId>, to: ObjectId) -> Result<BTreeSet<BString>, Error> {
        let empty = MemoryTree::default();
        let old = match from {
            Some(id) => &self.stored(id)?.tree,
            None => &empty,
        };
        let new = &self.stored(to)?.tree;

        let mut changed: BTreeSet<BString> = old
            .entries
            .iter()
            .filter(|(path, entry)| new.entries.get(*path) != Some(*entry))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            new.entries
                .keys()
                .filter(|path| !old.entries.contains_key(*path))
                .cloned(),
        );
        Ok(changed)
    }

    fn reference_tips(&self) -> Result<Vec<ReferenceTip>, Error> {
        Ok(self
            .references
            .iter()
            .map(|(name, id)| ReferenceTip::new(name.clone(), *id))
            .collect())
    }
}

/// Derive a stable made-up blob id from content.
fn content_id(content: &[u8]) -> ObjectId {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xb1;
    for (i, byte) in content.iter().enumerate() {
        let slot = 1 + i % 19;
        bytes[slot] = bytes[slot].wrapping_mul(31).wrapping_add(*byte);
    }
    ObjectId::Sha1(bytes)
}
