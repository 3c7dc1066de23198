//! Enumeration of the commits a reference transition introduces.
//!
//! A commit is introduced if it is reachable from the new tip but not from any reference
//! that exists besides the one being updated, nor from the old value of that reference.
//! The difference is computed with a two-colour walk over committer time, newest first:
//! commits reachable from an exclusion tip are painted uninteresting and the colour is
//! pushed down to their ancestors, even to ancestors that were already visited as
//! interesting.
//!
//! Committer times can go backwards, so no timestamp proves that an exclusion tip still in
//! the queue cannot reach a commit that was popped as interesting. The walk therefore only
//! stops early once nothing interesting is queued and every popped interesting commit has
//! been painted over. Otherwise it drains the queue, which may visit all history shared with
//! the exclusion tips but never reports a commit that is reachable from one of them.

use std::collections::{BinaryHeap, HashMap};

use gix_hash::ObjectId;

use crate::{Commit, Error, RefTransition, Repository};

/// The commits that must not be evaluated again when installing `transition`: the tips of
/// all other references plus the old value of the reference itself, sorted and deduplicated.
pub fn exclusion_tips<R: Repository>(repo: &R, transition: &RefTransition) -> Result<Vec<ObjectId>, Error> {
    let mut tips: Vec<ObjectId> = repo
        .reference_tips()?
        .into_iter()
        .filter(|tip| tip.name != transition.name())
        .map(|tip| tip.id)
        .collect();
    tips.extend(transition.old());
    tips.sort();
    tips.dedup();
    Ok(tips)
}

/// Commits reachable from `tip` but from none of `exclude`, newest first.
pub fn introduced_commits<R: Repository>(repo: &R, tip: ObjectId, exclude: &[ObjectId]) -> Result<Vec<Commit>, Error> {
    let mut walk = Walk::new(repo);
    for id in exclude {
        walk.mark_uninteresting(*id)?;
    }
    walk.enqueue(tip)?;

    let order = walk.run()?;
    let mut introduced = Vec::with_capacity(order.len());
    for id in order {
        if walk.is_uninteresting(id) {
            continue;
        }
        if let Some(commit) = walk.commits.remove(&id) {
            introduced.push(commit);
        }
    }
    tracing::debug!(%tip, excluded = exclude.len(), introduced = introduced.len(), "enumerated new commits");
    Ok(introduced)
}

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    uninteresting: bool,
    popped: bool,
}

struct Walk<'repo, R> {
    repo: &'repo R,
    flags: HashMap<ObjectId, Flags>,
    commits: HashMap<ObjectId, Commit>,
    queue: BinaryHeap<(i64, ObjectId)>,
    /// Queued commits that are not painted uninteresting.
    interesting_queued: usize,
    /// Popped commits that are still interesting, i.e. candidates for the result.
    interesting_popped: usize,
}

impl<'repo, R: Repository> Walk<'repo, R> {
    fn new(repo: &'repo R) -> Self {
        Walk {
            repo,
            flags: HashMap::new(),
            commits: HashMap::new(),
            queue: BinaryHeap::new(),
            interesting_queued: 0,
            interesting_popped: 0,
        }
    }

    fn is_uninteresting(&self, id: ObjectId) -> bool {
        self.flags.get(&id).is_some_and(|flags| flags.uninteresting)
    }

    /// Load `id` and put it into the queue unless it was seen before.
    fn enqueue(&mut self, id: ObjectId) -> Result<(), Error> {
        if self.commits.contains_key(&id) {
            return Ok(());
        }
        let commit = self.repo.find_commit(id)?;
        self.queue.push((commit.committer_time, id));
        self.commits.insert(id, commit);
        if !self.flags.entry(id).or_default().uninteresting {
            self.interesting_queued += 1;
        }
        Ok(())
    }

    /// Paint `id` uninteresting along with every ancestor that was already popped.
    fn mark_uninteresting(&mut self, id: ObjectId) -> Result<(), Error> {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let flags = self.flags.entry(id).or_default();
            if flags.uninteresting {
                continue;
            }
            flags.uninteresting = true;
            if flags.popped {
                // Its parents were queued as interesting already.
                self.interesting_popped -= 1;
                if let Some(commit) = self.commits.get(&id) {
                    pending.extend(commit.parent_ids.iter().copied());
                }
            } else if self.commits.contains_key(&id) {
                // Still queued, the colour travels on once it is popped.
                self.interesting_queued -= 1;
            } else {
                self.enqueue(id)?;
            }
        }
        Ok(())
    }

    /// Pop commits until the result can no longer change and return their ids in pop order.
    fn run(&mut self) -> Result<Vec<ObjectId>, Error> {
        let mut order = Vec::new();
        while let Some((_, id)) = self.queue.pop() {
            let parents = match self.commits.get(&id) {
                Some(commit) => commit.parent_ids.clone(),
                None => continue,
            };
            let flags = self.flags.entry(id).or_default();
            flags.popped = true;

            if flags.uninteresting {
                for parent in parents {
                    self.mark_uninteresting(parent)?;
                }
            } else {
                self.interesting_queued -= 1;
                self.interesting_popped += 1;
                order.push(id);
                for parent in parents {
                    self.enqueue(parent)?;
                }
            }

            if self.interesting_queued == 0 && self.interesting_popped == 0 {
                break;
            }
        }
        tracing::trace!(visited = self.flags.len(), "walk finished");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::{MemoryRepository, MemoryTree, DEFAULT_AUTHOR};
    use pretty_assertions::assert_eq;

    fn ids(commits: &[Commit]) -> Vec<ObjectId> {
        commits.iter().map(|c| c.id).collect()
    }

    fn linear(repo: &mut MemoryRepository, parent: Option<ObjectId>, n: usize) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut parent = parent;
        for i in 0..n {
            let parents: Vec<_> = parent.into_iter().collect();
            let id = repo.commit(&parents, &format!("commit {i}"), MemoryTree::new());
            out.push(id);
            parent = Some(id);
        }
        out
    }

    #[test]
    fn fast_forward_yields_only_new_commits_newest_first() {
        let mut repo = MemoryRepository::new();
        let history = linear(&mut repo, None, 3);
        let new = linear(&mut repo, Some(history[2]), 2);

        let introduced = introduced_commits(&repo, new[1], &[history[2]]).unwrap();
        assert_eq!(ids(&introduced), vec![new[1], new[0]]);
    }

    #[test]
    fn no_op_update_introduces_nothing() {
        let mut repo = MemoryRepository::new();
        let history = linear(&mut repo, None, 2);
        assert!(introduced_commits(&repo, history[1], &[history[1]]).unwrap().is_empty());
    }

    #[test]
    fn without_exclusions_everything_is_new() {
        let mut repo = MemoryRepository::new();
        let history = linear(&mut repo, None, 4);
        assert_eq!(introduced_commits(&repo, history[3], &[]).unwrap().len(), 4);
    }

    #[test]
    fn new_branch_skips_history_shared_with_other_references() {
        let mut repo = MemoryRepository::new();
        let master = linear(&mut repo, None, 5);
        repo.set_reference("refs/heads/master", master[4]);
        let topic = linear(&mut repo, Some(master[2]), 2);

        let transition = RefTransition::Created {
            new: topic[1],
            name: "refs/heads/topic".into(),
        };
        let exclude = exclusion_tips(&repo, &transition).unwrap();
        assert_eq!(exclude, vec![master[4]]);
        assert_eq!(
            ids(&introduced_commits(&repo, topic[1], &exclude).unwrap()),
            vec![topic[1], topic[0]]
        );
    }

    #[test]
    fn the_updated_reference_itself_is_not_an_exclusion_tip() {
        let mut repo = MemoryRepository::new();
        let master = linear(&mut repo, None, 2);
        repo.set_reference("refs/heads/master", master[1]);
        let transition = RefTransition::Updated {
            old: master[0],
            new: master[1],
            name: "refs/heads/master".into(),
        };
        assert_eq!(exclusion_tips(&repo, &transition).unwrap(), vec![master[0]]);
    }

    #[test]
    fn forced_update_evaluates_everything_not_reachable_elsewhere() {
        let mut repo = MemoryRepository::new();
        let base = linear(&mut repo, None, 2);
        let abandoned = linear(&mut repo, Some(base[1]), 2);
        let rewritten = linear(&mut repo, Some(base[0]), 2);

        let introduced = introduced_commits(&repo, rewritten[1], &[abandoned[1]]).unwrap();
        assert_eq!(ids(&introduced), vec![rewritten[1], rewritten[0]]);
    }

    #[test]
    fn merge_brings_in_the_side_branch() {
        let mut repo = MemoryRepository::new();
        let master = linear(&mut repo, None, 2);
        let side = linear(&mut repo, Some(master[0]), 2);
        let merge = repo.commit(&[master[1], side[1]], "merge", MemoryTree::new());

        let introduced = introduced_commits(&repo, merge, &[master[1]]).unwrap();
        assert_eq!(ids(&introduced), vec![merge, side[1], side[0]]);
    }

    #[test]
    fn clock_skew_does_not_leak_shared_commits() {
        let mut repo = MemoryRepository::new();
        let base = repo.commit_with(&[], "base", DEFAULT_AUTHOR, 10, MemoryTree::new());
        let skewed = repo.commit_with(&[base], "committed with a broken clock", DEFAULT_AUTHOR, 1, MemoryTree::new());
        let new = repo.commit_with(&[base], "new", DEFAULT_AUTHOR, 20, MemoryTree::new());

        let introduced = introduced_commits(&repo, new, &[skewed]).unwrap();
        assert_eq!(ids(&introduced), vec![new]);
    }

    #[test]
    fn exclusion_tips_with_old_clocks_are_always_reached() {
        let mut repo = MemoryRepository::new();
        let base = repo.commit_with(&[], "base", DEFAULT_AUTHOR, 50, MemoryTree::new());
        let stale = repo.commit_with(&[base], "committed with a broken clock", DEFAULT_AUTHOR, 1, MemoryTree::new());
        // An unrelated history whose commits all sort between the base and the stale tip.
        let mut unrelated = None;
        for time in 30..40 {
            let parents: Vec<_> = unrelated.into_iter().collect();
            unrelated = Some(repo.commit_with(&parents, "unrelated", DEFAULT_AUTHOR, time, MemoryTree::new()));
        }
        let unrelated = unrelated.unwrap();
        let new = repo.commit_with(&[base], "new", DEFAULT_AUTHOR, 100, MemoryTree::new());

        let introduced = introduced_commits(&repo, new, &[stale, unrelated]).unwrap();
        assert_eq!(ids(&introduced), vec![new]);
    }

    #[test]
    fn deep_exclusion_tip_behind_the_new_history_is_found() {
        let mut repo = MemoryRepository::new();
        let root = repo.commit_with(&[], "root", DEFAULT_AUTHOR, 1000, MemoryTree::new());
        let mut tip = root;
        for time in 0..20 {
            tip = repo.commit_with(&[tip], "old clock", DEFAULT_AUTHOR, time, MemoryTree::new());
        }
        let new = linear(&mut repo, Some(root), 1)[0];

        assert_eq!(ids(&introduced_commits(&repo, new, &[tip]).unwrap()), vec![new]);
    }

    #[test]
    fn removed_references_no_longer_exclude_their_history() {
        let mut repo = MemoryRepository::new();
        let master = linear(&mut repo, None, 2);
        let topic = linear(&mut repo, Some(master[1]), 1);
        repo.set_reference("refs/heads/master", master[1]);
        repo.set_reference("refs/heads/topic", topic[0]);

        let transition = RefTransition::Created {
            new: topic[0],
            name: "refs/heads/copy".into(),
        };
        let exclude = exclusion_tips(&repo, &transition).unwrap();
        assert!(introduced_commits(&repo, topic[0], &exclude).unwrap().is_empty());

        repo.remove_reference("refs/heads/topic");
        let exclude = exclusion_tips(&repo, &transition).unwrap();
        assert_eq!(ids(&introduced_commits(&repo, topic[0], &exclude).unwrap()), vec![topic[0]]);
    }

    #[test]
    fn missing_commits_are_fatal() {
        let mut repo = MemoryRepository::new();
        let history = linear(&mut repo, None, 3);
        repo.forget(history[0]);
        let err = introduced_commits(&repo, history[2], &[]).unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable { id, .. } if id == history[0]));
    }
}
