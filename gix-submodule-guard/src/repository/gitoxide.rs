//! Repository queries backed by `gix`.
//!
//! While a push is being received git keeps the incoming objects in a quarantine
//! directory (announced to hooks as `GIT_QUARANTINE_PATH`) until every hook accepted
//! the update. Objects are therefore looked up in the quarantine first and in the main
//! object database second.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bstr::{BStr, BString, ByteSlice};
use gix_diff::tree::recorder;
use gix_hash::ObjectId;
use gix_object::Find;

use super::{Commit, EntryKind, ReferenceTip, Repository, TreeEntry};
use crate::{Error, GuardConfig};

/// A [`Repository`] reading from an on-disk git repository.
pub struct GixRepository {
    repo: gix::Repository,
    quarantine: Option<gix_odb::Handle>,
}

/// An owned entry of a single tree object.
struct Entry {
    name: BString,
    kind: EntryKind,
    id: ObjectId,
}

/// The object databases visible to the hook, the quarantine taking precedence.
#[derive(Clone, Copy)]
struct Objects<'repo> {
    quarantine: Option<&'repo gix_odb::Handle>,
    main: &'repo gix::OdbHandle,
}

impl Find for Objects<'_> {
    fn try_find<'a>(
        &self,
        id: &gix_hash::oid,
        buffer: &'a mut Vec<u8>,
    ) -> Result<Option<gix_object::Data<'a>>, gix_object::find::Error> {
        if let Some(quarantine) = self.quarantine {
            let mut scratch = Vec::new();
            if let Some(data) = quarantine.try_find(id, &mut scratch)? {
                let kind = data.kind;
                buffer.clear();
                buffer.extend_from_slice(data.data);
                return Ok(Some(gix_object::Data::new(kind, buffer)));
            }
        }
        self.main.try_find(id, buffer)
    }
}

impl GixRepository {
    /// Open the repository at `git_dir`.
    ///
    /// Environment variables and global configuration are ignored; the hook environment
    /// points `GIT_OBJECT_DIRECTORY` at the quarantine, which is attached explicitly with
    /// [`with_quarantine()`](Self::with_quarantine()) instead.
    pub fn open(git_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let git_dir = git_dir.into();
        let repo = gix::open_opts(&git_dir, gix::open::Options::isolated()).map_err(|e| {
            Error::Repository(format!("failed to open repository at '{}': {e}", git_dir.display()))
        })?;
        tracing::debug!(git_dir = %git_dir.display(), "opened repository");
        Ok(Self { repo, quarantine: None })
    }

    /// Also look up objects in the quarantine `objects_dir` of an in-progress push.
    pub fn with_quarantine(mut self, objects_dir: impl AsRef<Path>) -> Result<Self, Error> {
        let objects_dir = objects_dir.as_ref();
        self.quarantine = Some(gix_odb::at(objects_dir)?);
        tracing::debug!(quarantine = %objects_dir.display(), "attached quarantine object store");
        Ok(self)
    }

    /// Load the guard configuration from the repository's git configuration.
    pub fn load_config(&self) -> Result<GuardConfig, Error> {
        let snapshot = self.repo.config_snapshot();
        GuardConfig::from_config(snapshot.plumbing())
    }

    fn objects(&self) -> Objects<'_> {
        Objects {
            quarantine: self.quarantine.as_ref(),
            main: &self.repo.objects,
        }
    }

    /// Find the object `id`, preferring the quarantine, and return its kind and a copy of its data.
    fn find_object(&self, id: ObjectId) -> Result<(gix_object::Kind, Vec<u8>), Error> {
        let mut buf = Vec::new();
        match self
            .objects()
            .try_find(&id, &mut buf)
            .map_err(|e| Error::unavailable(id, format!("lookup failed: {e}")))?
        {
            Some(data) => Ok((data.kind, data.data.to_vec())),
            None => Err(Error::unavailable(id, "object not found")),
        }
    }

    /// The tree object of `commit`, or no data at all for the empty side of a root commit.
    fn commit_tree_data(&self, commit: Option<ObjectId>) -> Result<Vec<u8>, Error> {
        match commit {
            Some(id) => {
                let tree = self.find_commit(id)?.tree;
                self.find_kind(tree, gix_object::Kind::Tree)
            }
            None => Ok(Vec::new()),
        }
    }

    fn find_kind(&self, id: ObjectId, expected: gix_object::Kind) -> Result<Vec<u8>, Error> {
        let (kind, data) = self.find_object(id)?;
        if kind != expected {
            return Err(Error::unavailable(
                id,
                format!("expected {expected:?} object, found {kind:?}"),
            ));
        }
        Ok(data)
    }

    fn read_tree(&self, id: ObjectId) -> Result<Vec<Entry>, Error> {
        let data = self.find_kind(id, gix_object::Kind::Tree)?;
        let tree = gix_object::TreeRef::from_bytes(&data)
            .map_err(|e| Error::unavailable(id, format!("failed to decode tree: {e}")))?;
        Ok(tree
            .entries
            .iter()
            .map(|entry| Entry {
                name: entry.filename.to_owned(),
                kind: entry_kind(entry.mode),
                id: entry.oid.to_owned(),
            })
            .collect())
    }

    /// Peel `id` through annotated tags. Returns `None` if it ends in something other than a commit.
    fn peel_to_commit(&self, mut id: ObjectId) -> Result<Option<ObjectId>, Error> {
        loop {
            let (kind, data) = self.find_object(id)?;
            match kind {
                gix_object::Kind::Commit => return Ok(Some(id)),
                gix_object::Kind::Tag => {
                    let tag = gix_object::TagRef::from_bytes(&data)
                        .map_err(|e| Error::unavailable(id, format!("failed to decode tag: {e}")))?;
                    id = tag.target();
                }
                gix_object::Kind::Tree | gix_object::Kind::Blob => return Ok(None),
            }
        }
    }
}

impl Repository for GixRepository {
    fn find_commit(&self, id: ObjectId) -> Result<Commit, Error> {
        let data = self.find_kind(id, gix_object::Kind::Commit)?;
        decode_commit(id, &data)
    }

    fn tree_entry(&self, commit: ObjectId, path: &BStr) -> Result<Option<TreeEntry>, Error> {
        let mut tree = self.find_commit(commit)?.tree;
        let mut components = path.split_str("/").filter(|c| !c.is_empty()).peekable();

        while let Some(component) = components.next() {
            let Some(entry) = self
                .read_tree(tree)?
                .into_iter()
                .find(|entry| entry.name.as_slice() == component)
            else {
                return Ok(None);
            };
            if components.peek().is_none() {
                return Ok(Some(TreeEntry {
                    path: path.to_owned(),
                    id: entry.id,
                    kind: entry.kind,
                }));
            }
            if entry.kind != EntryKind::Directory {
                return Ok(None);
            }
            tree = entry.id;
        }
        Ok(None)
    }

    fn changed_paths(&self, from: Option<ObjectId>, to: ObjectId) -> Result<BTreeSet<BString>, Error> {
        let old_tree = self.commit_tree_data(from)?;
        let new_tree = self.commit_tree_data(Some(to))?;

        let mut recorder = gix_diff::tree::Recorder::default();
        gix_diff::tree(
            gix_object::TreeRefIter::from_bytes(&old_tree),
            gix_object::TreeRefIter::from_bytes(&new_tree),
            &mut gix_diff::tree::State::default(),
            self.objects(),
            &mut recorder,
        )
        .map_err(|e| Error::unavailable(to, format!("failed to diff trees: {e}")))?;

        // Directories are only containers, what changed is the entries within.
        let changed: BTreeSet<BString> = recorder
            .records
            .into_iter()
            .filter_map(|change| match change {
                recorder::Change::Addition { entry_mode, path, .. }
                | recorder::Change::Deletion { entry_mode, path, .. } => (!entry_mode.is_tree()).then_some(path),
                recorder::Change::Modification {
                    previous_entry_mode,
                    entry_mode,
                    path,
                    ..
                } => (!(previous_entry_mode.is_tree() && entry_mode.is_tree())).then_some(path),
            })
            .collect();
        tracing::trace!(?from, %to, count = changed.len(), "computed changed paths");
        Ok(changed)
    }

    fn reference_tips(&self) -> Result<Vec<ReferenceTip>, Error> {
        let platform = self
            .repo
            .references()
            .map_err(|e| Error::Repository(format!("reference iteration: {e}")))?;
        let iter = platform
            .all()
            .map_err(|e| Error::Repository(format!("reference iteration: {e}")))?;

        let mut tips = Vec::new();
        for reference in iter {
            let reference = reference.map_err(|e| Error::Repository(format!("reference iteration: {e}")))?;
            let name = reference.name().as_bstr().to_string();
            // Symbolic refs point at another ref which is listed on its own.
            let gix::refs::TargetRef::Object(target) = reference.target() else {
                continue;
            };
            match self.peel_to_commit(target.to_owned())? {
                Some(id) => tips.push(ReferenceTip::new(name, id)),
                None => tracing::trace!(%name, "reference does not point to a commit"),
            }
        }
        Ok(tips)
    }
}

fn entry_kind(mode: gix_object::tree::EntryMode) -> EntryKind {
    use gix_object::tree::EntryKind as Mode;
    match mode.kind() {
        Mode::Tree => EntryKind::Directory,
        Mode::Blob | Mode::BlobExecutable => EntryKind::File,
        Mode::Link => EntryKind::Symlink,
        Mode::Commit => EntryKind::SubmoduleLink,
    }
}

/// Decode the commit `id` from its raw `data`.
fn decode_commit(id: ObjectId, data: &[u8]) -> Result<Commit, Error> {
    let commit = gix_object::CommitRef::from_bytes(data)
        .map_err(|e| Error::unavailable(id, format!("failed to decode commit: {e}")))?;
    let committer_time = commit
        .committer
        .time()
        .map_err(|e| Error::unavailable(id, format!("failed to decode committer time: {e}")))?
        .seconds;

    let mut author = commit.author.name.to_owned();
    author.extend_from_slice(b" <");
    author.extend_from_slice(commit.author.email);
    author.push(b'>');

    Ok(Commit {
        id,
        parent_ids: commit.parents().collect(),
        author,
        message: commit.message.to_owned(),
        tree: commit.tree(),
        committer_time,
    })
}
