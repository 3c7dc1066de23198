//! The evaluation pipeline for a single reference transition.
//!
//! ```
//! use gix_submodule_guard::repository::memory::{MemoryRepository, MemoryTree};
//! use gix_submodule_guard::{Guard, GuardConfig, RefTransition};
//!
//! let mut repo = MemoryRepository::new();
//! let root = repo.commit(&[], "initial commit", MemoryTree::new().file("README.txt", "hi"));
//! let guard = Guard::new(&repo, GuardConfig::default());
//!
//! let verdict = guard
//!     .evaluate(&RefTransition::Created { new: root, name: "refs/heads/master".into() })
//!     .unwrap();
//! assert!(verdict.is_accept());
//! ```

use crate::policy::{self, Verdict};
use crate::submodule::{changed_submodule_paths, display_paths};
use crate::{walk, Error, GuardConfig, RefTransition, Repository};

/// Decides whether reference transitions may proceed.
pub struct Guard<R> {
    repo: R,
    config: GuardConfig,
}

impl<R: Repository> Guard<R> {
    /// Create a guard answering queries from `repo`.
    pub fn new(repo: R, config: GuardConfig) -> Self {
        Guard { repo, config }
    }

    /// The configuration transitions are evaluated with.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Evaluate `transition`.
    ///
    /// Deletions are accepted without touching the repository. Otherwise every commit the
    /// transition introduces is checked, and all violations are collected in enumeration
    /// order before the verdict is returned. Errors mean the transition could not be
    /// verified and must be rejected by the caller.
    pub fn evaluate(&self, transition: &RefTransition) -> Result<Verdict, Error> {
        if !self.config.enabled {
            tracing::info!(refname = transition.name(), "submodule guard is disabled");
            return Ok(Verdict::Accept);
        }
        let Some(new) = transition.new_tip() else {
            tracing::info!(refname = transition.name(), "accepting deletion");
            return Ok(Verdict::Accept);
        };

        tracing::debug!(refname = transition.name(), keyword = %self.config.keyword, "evaluating transition");
        let exclude = walk::exclusion_tips(&self.repo, transition)?;
        let commits = walk::introduced_commits(&self.repo, new, &exclude)?;

        let mut violations = Vec::new();
        for commit in commits {
            let paths = changed_submodule_paths(&self.repo, &commit)?;
            if paths.is_empty() {
                continue;
            }
            tracing::debug!(commit = %commit.id, paths = %display_paths(&paths), "commit changes submodules");
            if let Some(violation) = policy::check(&self.config.keyword, commit, paths) {
                violations.push(violation);
            }
        }

        let verdict = Verdict::from_violations(violations);
        tracing::info!(
            refname = transition.name(),
            accepted = verdict.is_accept(),
            violations = verdict.violations().len(),
            "evaluated reference transition"
        );
        Ok(verdict)
    }
}
