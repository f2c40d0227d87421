//! In-memory [`Vcs`] used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use git2::Oid;
use indexmap::IndexMap;

use crate::errors::GitError;
use crate::git::{Vcs, WorkingTreeDiff};

/// A commit recorded by [`FakeVcs::commit_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub branch: String,
    pub files: Vec<String>,
    pub restored: Vec<String>,
    pub message: String,
}

/// Scriptable fake repository.
///
/// Every branch "differs from the base" by the files it was registered
/// with; every (branch, path) pair compares equal to the working tree
/// unless marked changed or missing.
#[derive(Debug, Default)]
pub struct FakeVcs {
    branches: RefCell<IndexMap<String, Vec<String>>>,
    modified: Vec<String>,
    changed: RefCell<HashSet<(String, String)>>,
    missing: RefCell<HashSet<(String, String)>>,
    pull_conflicts: Vec<String>,
    head: Cell<u8>,
    pub commits: RefCell<Vec<RecordedCommit>>,
    pub created: RefCell<Vec<String>>,
    pub pushed: RefCell<Vec<String>>,
    pub pulls: Cell<usize>,
}

impl FakeVcs {
    pub fn new() -> Self {
        let vcs = Self::default();
        vcs.head.set(1);
        vcs
    }

    pub fn with_branch(self, name: &str, files: &[&str]) -> Self {
        self.branches
            .borrow_mut()
            .insert(name.to_string(), files.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_modified(mut self, paths: &[&str]) -> Self {
        self.modified = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_changed(self, branch: &str, path: &str) -> Self {
        self.changed
            .borrow_mut()
            .insert((branch.to_string(), path.to_string()));
        self
    }

    pub fn with_missing(self, branch: &str, path: &str) -> Self {
        self.missing
            .borrow_mut()
            .insert((branch.to_string(), path.to_string()));
        self
    }

    pub fn with_pull_conflicts(mut self, lines: &[&str]) -> Self {
        self.pull_conflicts = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Number of mutating calls (branch creation, commits, pushes, pulls).
    pub fn mutations(&self) -> usize {
        self.commits.borrow().len()
            + self.created.borrow().len()
            + self.pushed.borrow().len()
            + self.pulls.get()
    }

    pub fn head_oid(&self) -> Oid {
        oid(self.head.get())
    }
}

fn oid(n: u8) -> Oid {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    bytes[0] = 0xaa;
    Oid::from_bytes(&bytes).expect("20-byte oid")
}

impl Vcs for FakeVcs {
    fn list_branches(&self) -> Result<Vec<String>, GitError> {
        Ok(self.branches.borrow().keys().cloned().collect())
    }

    fn list_modified_and_untracked(&self) -> Result<Vec<String>, GitError> {
        let mut paths = self.modified.clone();
        paths.sort();
        Ok(paths)
    }

    fn diff_paths(&self, _from: &str, to: &str) -> Result<Vec<String>, GitError> {
        self.branches
            .borrow()
            .get(to)
            .cloned()
            .ok_or_else(|| GitError::RefNotFound(to.to_string()))
    }

    fn working_tree_diff(&self, branch: &str, path: &str) -> Result<WorkingTreeDiff, GitError> {
        if !self.branches.borrow().contains_key(branch) {
            return Err(GitError::RefNotFound(branch.to_string()));
        }
        let key = (branch.to_string(), path.to_string());
        if self.missing.borrow().contains(&key) {
            Ok(WorkingTreeDiff::MissingOnBranch)
        } else if self.changed.borrow().contains(&key) {
            Ok(WorkingTreeDiff::Differs)
        } else {
            Ok(WorkingTreeDiff::Same)
        }
    }

    fn create_branch(&self, name: &str) -> Result<(), GitError> {
        let mut branches = self.branches.borrow_mut();
        if branches.contains_key(name) {
            return Err(GitError::BranchExists(name.to_string()));
        }
        branches.insert(name.to_string(), Vec::new());
        self.created.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn commit_files(
        &self,
        branch: &str,
        files: &[String],
        restore: &[String],
        _base: &str,
        message: &str,
    ) -> Result<Oid, GitError> {
        let mut branches = self.branches.borrow_mut();
        let committed = branches
            .get_mut(branch)
            .ok_or_else(|| GitError::RefNotFound(branch.to_string()))?;
        committed.retain(|f| !restore.contains(f));
        for file in files {
            if !committed.contains(file) {
                committed.push(file.clone());
            }
            let key = (branch.to_string(), file.clone());
            self.changed.borrow_mut().remove(&key);
            self.missing.borrow_mut().remove(&key);
        }
        let mut commits = self.commits.borrow_mut();
        commits.push(RecordedCommit {
            branch: branch.to_string(),
            files: files.to_vec(),
            restored: restore.to_vec(),
            message: message.to_string(),
        });
        Ok(oid(100 + commits.len() as u8))
    }

    fn push_branch(&self, _remote: &str, branch: &str) -> Result<(), GitError> {
        self.pushed.borrow_mut().push(branch.to_string());
        Ok(())
    }

    fn merge_base(&self, _a: &str, _b: &str) -> Result<Oid, GitError> {
        Ok(self.head_oid())
    }

    fn pull_and_replay(&self, _remote: &str, _mainline: &str) -> Result<Vec<String>, GitError> {
        self.pulls.set(self.pulls.get() + 1);
        self.head.set(self.head.get() + 1);
        Ok(self.pull_conflicts.clone())
    }
}
