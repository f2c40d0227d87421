//! The gg engine: every user-facing operation, and the pull/resolve state
//! machine.
//!
//! Sync states:
//!
//! - `Clean`: no conflict marker on disk. Every command is allowed.
//! - `PullInFlight`: transient, inside [`SyncEngine::pull`].
//! - `ConflictPending`: the marker exists. Only `resolve` (and `status`)
//!   may run; `commit-all`, `push-all` and `pull` fail before touching git.
//!
//! A clean pull and a `resolve` both end by committing every branch with a
//! forced "Merge." commit computed against the pre-pull merge-base, so each
//! branch records the merge point.

use std::path::{Path, PathBuf};

use git2::Oid;
use tracing::{debug, info, instrument};

use crate::assignment::BranchAssignment;
use crate::config::GgConfig;
use crate::conflict::{ConflictMarker, ConflictStore, SyncState};
use crate::derive::derive_assignment;
use crate::errors::{AssignmentError, GgError, GitError};
use crate::git::Vcs;
use crate::reconcile::{ReconcileReport, Reconciler, MERGE_HEADER, UPDATE_HEADER};
use crate::store::AssignmentStore;

/// Result of [`SyncEngine::pull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Local edits replayed cleanly and every branch received a merge commit.
    Merged {
        before: Oid,
        after: Oid,
        report: ReconcileReport,
    },
    /// At least one path conflicted; the marker now blocks other commands.
    Conflicted {
        before: Oid,
        after: Oid,
        marker: ConflictMarker,
    },
}

/// Snapshot for `gg status`.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// The persisted assignment, if the file exists.
    pub assignment: Option<BranchAssignment>,
    /// Modified or untracked files no branch has claimed.
    pub unclaimed: Vec<String>,
    pub state: SyncState,
}

/// Drives every gg command against one working tree.
pub struct SyncEngine<V: Vcs> {
    vcs: V,
    config: GgConfig,
    root: PathBuf,
    store: AssignmentStore,
    conflicts: ConflictStore,
}

impl<V: Vcs> SyncEngine<V> {
    /// Create an engine for the working tree rooted at `root`.
    pub fn new(vcs: V, config: GgConfig, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let store = AssignmentStore::new(root.join(&config.assignment_file));
        let conflicts = ConflictStore::new(root.join(&config.conflict_file));
        debug!(root = %root.display(), "initializing engine");
        Self {
            vcs,
            config,
            root,
            store,
            conflicts,
        }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn config(&self) -> &GgConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &AssignmentStore {
        &self.store
    }

    pub fn conflicts(&self) -> &ConflictStore {
        &self.conflicts
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    /// Derive the assignment from history and persist it. No commits.
    #[instrument(skip(self))]
    pub fn update_branch_map(&self) -> Result<BranchAssignment, GgError> {
        let derived = derive_assignment(&self.vcs, &self.config, &self.config.mainline)?;
        self.store.save(&derived)?;
        info!(branches = derived.len(), "branch map updated from history");
        Ok(derived)
    }

    /// Assign `file` to `branch` in the persisted assignment. No commits.
    #[instrument(skip(self))]
    pub fn set_branch(&self, file: &str, branch: &str) -> Result<BranchAssignment, GgError> {
        if branch == self.config.mainline {
            return Err(AssignmentError::ReservedBranch(branch.to_string()).into());
        }
        let file = file.strip_prefix("./").unwrap_or(file);
        Ok(self.store.reassign(file, branch)?)
    }

    // -----------------------------------------------------------------------
    // Commands requiring a clean state
    // -----------------------------------------------------------------------

    /// Reconcile the persisted assignment against what is committed today.
    #[instrument(skip(self))]
    pub fn commit_all(&self) -> Result<ReconcileReport, GgError> {
        self.conflicts.ensure_clean()?;
        let existing = derive_assignment(&self.vcs, &self.config, &self.config.mainline)?;
        let target = self.store.load()?;
        let report = Reconciler::new(&self.vcs, &self.config).reconcile(
            &existing,
            &target,
            false,
            UPDATE_HEADER,
        )?;
        Ok(report)
    }

    /// Push every local branch to its same-named remote branch.
    #[instrument(skip(self))]
    pub fn push_all(&self) -> Result<Vec<String>, GgError> {
        self.conflicts.ensure_clean()?;
        let branches = self.vcs.list_branches()?;
        for branch in &branches {
            self.vcs.push_branch(&self.config.remote, branch)?;
        }
        info!(count = branches.len(), remote = %self.config.remote, "pushed all branches");
        Ok(branches)
    }

    /// Pull the remote mainline, replay local edits, then either commit a
    /// merge on every branch or record the conflicts for `resolve`.
    #[instrument(skip(self))]
    pub fn pull(&self) -> Result<PullOutcome, GgError> {
        self.conflicts.ensure_clean()?;

        let before = self.current_merge_base()?;
        let conflicts = self
            .vcs
            .pull_and_replay(&self.config.remote, &self.config.mainline)?;
        let after = self.current_merge_base()?;
        info!(%before, %after, conflicts = conflicts.len(), "pull finished");

        if conflicts.is_empty() {
            let report = self.merge_all(&before.to_string())?;
            return Ok(PullOutcome::Merged {
                before,
                after,
                report,
            });
        }

        let marker = ConflictMarker {
            merge_base: before.to_string(),
            conflicts,
        };
        self.conflicts.record(&marker)?;
        Ok(PullOutcome::Conflicted {
            before,
            after,
            marker,
        })
    }

    /// Consume the conflict marker and commit the merge on every branch.
    /// The conflicting files must already be fixed in the working tree.
    #[instrument(skip(self))]
    pub fn resolve(&self) -> Result<ReconcileReport, GgError> {
        let marker = self.conflicts.take()?;
        info!(base = %marker.merge_base, "resolving pending conflict");
        Ok(self.merge_all(&marker.merge_base)?)
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Persisted assignment, unclaimed files and sync state.
    pub fn status(&self) -> Result<StatusReport, GgError> {
        let state = self.conflicts.state()?;
        let assignment = if self.store.exists() {
            Some(self.store.load()?)
        } else {
            None
        };
        let derived = derive_assignment(&self.vcs, &self.config, &self.config.mainline)?;
        let unclaimed = derived
            .files(&self.config.catch_all)
            .iter()
            .filter(|f| {
                assignment
                    .as_ref()
                    .map_or(true, |a| a.owner_of(f).is_none())
            })
            .cloned()
            .collect();
        Ok(StatusReport {
            assignment,
            unclaimed,
            state,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn current_merge_base(&self) -> Result<Oid, GitError> {
        self.vcs.merge_base("HEAD", &self.config.mainline)
    }

    /// Force a "Merge." commit on every branch, diffing against `base`.
    fn merge_all(&self, base: &str) -> Result<ReconcileReport, GitError> {
        let current = derive_assignment(&self.vcs, &self.config, base)?;
        Reconciler::new(&self.vcs, &self.config).reconcile(&current, &current, true, MERGE_HEADER)
    }
}
