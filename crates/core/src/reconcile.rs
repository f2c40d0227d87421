//! Turn a target assignment into at most one new commit per branch.
//!
//! A branch is skipped when none of its files differ from its tip, its file
//! list is unchanged relative to the existing assignment, and the caller did
//! not force a commit. Running a reconciliation twice in a row therefore
//! creates no commits the second time.
//!
//! Any gateway failure aborts the walk; branches committed earlier in the
//! same pass keep their commits.

use git2::Oid;
use tracing::{info, instrument, warn};

use crate::assignment::BranchAssignment;
use crate::config::GgConfig;
use crate::errors::GitError;
use crate::git::Vcs;

/// Commit message header for ordinary reconciliation.
pub const UPDATE_HEADER: &str = "Update.";

/// Commit message header for the forced commits after a pull.
pub const MERGE_HEADER: &str = "Merge.";

/// What happened to one branch during a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    Skipped {
        branch: String,
        created: bool,
    },
    Committed {
        branch: String,
        created: bool,
        commit: Oid,
        /// Every file assigned to the branch.
        files: Vec<String>,
        /// The subset whose content differed from the previous tip.
        changed: Vec<String>,
        /// Files in the existing assignment that the target dropped.
        removed: Vec<String>,
    },
}

impl BranchOutcome {
    pub fn branch(&self) -> &str {
        match self {
            Self::Skipped { branch, .. } | Self::Committed { branch, .. } => branch,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Per-branch outcomes of one reconciliation pass, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub outcomes: Vec<BranchOutcome>,
}

impl ReconcileReport {
    pub fn committed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_committed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.committed_count()
    }
}

/// Build the commit message: header line, blank line, `- <file>` per file.
pub fn commit_message(header: &str, files: &[String]) -> String {
    let mut message = String::from(header);
    message.push_str("\n\n");
    for file in files {
        message.push_str("- ");
        message.push_str(file);
        message.push('\n');
    }
    message
}

/// Applies target assignments through a [`Vcs`].
pub struct Reconciler<'a, V: Vcs> {
    vcs: &'a V,
    config: &'a GgConfig,
}

impl<'a, V: Vcs> Reconciler<'a, V> {
    pub fn new(vcs: &'a V, config: &'a GgConfig) -> Self {
        Self { vcs, config }
    }

    /// Reconcile every non-reserved branch of `target` against `existing`.
    #[instrument(skip(self, existing, target), fields(branches = target.len()))]
    pub fn reconcile(
        &self,
        existing: &BranchAssignment,
        target: &BranchAssignment,
        force_all: bool,
        header: &str,
    ) -> Result<ReconcileReport, GitError> {
        let known = self.vcs.list_branches()?;
        let mut report = ReconcileReport::default();

        for (branch, files) in target.iter() {
            if branch == self.config.catch_all {
                continue;
            }
            if branch == self.config.mainline {
                warn!(branch, "refusing to reconcile the mainline, skipping");
                continue;
            }

            let created = !known.iter().any(|b| b == branch);
            if created {
                self.vcs.create_branch(branch)?;
            }

            let mut changed = Vec::new();
            for file in files {
                if self.vcs.working_tree_diff(branch, file)?.needs_commit() {
                    changed.push(file.clone());
                }
            }

            let previous = existing.files(branch);
            if changed.is_empty() && previous == files && !force_all {
                info!(branch, "skipping, no new files to update");
                report.outcomes.push(BranchOutcome::Skipped {
                    branch: branch.to_string(),
                    created,
                });
                continue;
            }

            let mut removed: Vec<String> = previous
                .iter()
                .filter(|f| !files.contains(f))
                .cloned()
                .collect();
            removed.sort();

            info!(
                branch,
                files = ?files,
                modified_files = ?changed,
                removed_files = ?removed,
                "committing"
            );
            let commit = self.vcs.commit_files(
                branch,
                files,
                &removed,
                &self.config.mainline,
                &commit_message(header, files),
            )?;

            report.outcomes.push(BranchOutcome::Committed {
                branch: branch.to_string(),
                created,
                commit,
                files: files.to_vec(),
                changed,
                removed,
            });
        }

        info!(
            committed = report.committed_count(),
            skipped = report.skipped_count(),
            "reconciliation finished"
        );
        Ok(report)
    }
}
