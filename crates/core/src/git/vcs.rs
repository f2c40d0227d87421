//! The version-control seam used by the engine.
//!
//! [`GitClient`](super::GitClient) is the real implementation; tests drive
//! the engine through an in-memory fake.

use git2::Oid;

use crate::errors::GitError;

/// How a working-tree file compares to the same path on a branch tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingTreeDiff {
    /// Content is identical on the branch and in the working tree, or the
    /// path exists in neither.
    Same,
    /// Content differs, or the file was removed from the working tree.
    Differs,
    /// The path does not exist at the branch tip (a new file).
    MissingOnBranch,
}

impl WorkingTreeDiff {
    /// `true` when committing the path would change the branch.
    pub fn needs_commit(self) -> bool {
        !matches!(self, Self::Same)
    }
}

/// Operations gg needs from version control.
///
/// Every error is fatal to the calling command; implementations do not
/// retry.
pub trait Vcs {
    /// Short names of all local branches.
    fn list_branches(&self) -> Result<Vec<String>, GitError>;

    /// Working-tree paths that are modified (including deleted) relative to
    /// the index, or untracked and not ignored. Sorted.
    fn list_modified_and_untracked(&self) -> Result<Vec<String>, GitError>;

    /// Paths that differ between two commit-ish references, in diff order.
    fn diff_paths(&self, from: &str, to: &str) -> Result<Vec<String>, GitError>;

    /// Compare `path` at the tip of `branch` with the working tree.
    fn working_tree_diff(&self, branch: &str, path: &str) -> Result<WorkingTreeDiff, GitError>;

    /// Create `name` pointing at `HEAD`. Fails if it already exists.
    fn create_branch(&self, name: &str) -> Result<(), GitError>;

    /// Record the working-tree content of `files` on top of `branch`'s tree
    /// as one new commit parented on its tip, then advance the branch.
    ///
    /// Every path in `restore` goes back to its content at `base`, or is
    /// dropped from the tree when `base` does not have it.
    fn commit_files(
        &self,
        branch: &str,
        files: &[String],
        restore: &[String],
        base: &str,
        message: &str,
    ) -> Result<Oid, GitError>;

    /// Push `branch` to the same-named branch on `remote`.
    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Best common ancestor of two references.
    fn merge_base(&self, a: &str, b: &str) -> Result<Oid, GitError>;

    /// Stash local changes (untracked included), pull `remote`/`mainline`,
    /// replay every stashed path with a three-way merge and drop the stash.
    ///
    /// Returns one `Conflict: <path>` line per path that could not be merged
    /// cleanly; an empty list means the replay was clean.
    fn pull_and_replay(&self, remote: &str, mainline: &str) -> Result<Vec<String>, GitError>;
}
