//! The branch → files assignment shared by the store, the deriver and the
//! reconciler.

use std::collections::HashMap;

use indexmap::IndexMap;

/// Ordered mapping from branch name to the ordered files assigned to it.
///
/// Iteration follows insertion order, which is also the order branches are
/// written to the assignment file and reconciled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchAssignment {
    branches: IndexMap<String, Vec<String>>,
}

impl BranchAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of branches (including an empty or catch-all entry).
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn contains_branch(&self, branch: &str) -> bool {
        self.branches.contains_key(branch)
    }

    /// Files assigned to `branch`; an unknown branch has none.
    pub fn files(&self, branch: &str) -> &[String] {
        self.branches.get(branch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the file list of `branch`, keeping its position if it already
    /// exists.
    pub fn set_files(&mut self, branch: impl Into<String>, files: Vec<String>) {
        self.branches.insert(branch.into(), files);
    }

    /// Make sure `branch` has an entry, appending an empty one if needed.
    pub fn ensure_branch(&mut self, branch: &str) -> &mut Vec<String> {
        self.branches.entry(branch.to_string()).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.branches
            .iter()
            .map(|(branch, files)| (branch.as_str(), files.as_slice()))
    }

    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    /// The first branch whose list contains `path`.
    pub fn owner_of(&self, path: &str) -> Option<&str> {
        self.branches
            .iter()
            .find(|(_, files)| files.iter().any(|f| f == path))
            .map(|(branch, _)| branch.as_str())
    }

    /// Move `path` to the end of `target`'s list, removing it from every
    /// other branch first. The path may be absent from all branches.
    pub fn reassign(&mut self, path: &str, target: &str) {
        for files in self.branches.values_mut() {
            files.retain(|f| f != path);
        }
        self.ensure_branch(target).push(path.to_string());
    }

    /// Paths listed under more than one branch, with every branch claiming
    /// them. Sorted by path.
    pub fn overlaps(&self) -> Vec<(String, Vec<String>)> {
        let mut owners: HashMap<&str, Vec<String>> = HashMap::new();
        for (branch, files) in &self.branches {
            for file in files {
                let claimed = owners.entry(file.as_str()).or_default();
                if !claimed.contains(branch) {
                    claimed.push(branch.clone());
                }
            }
        }
        let mut overlaps: Vec<(String, Vec<String>)> = owners
            .into_iter()
            .filter(|(_, branches)| branches.len() > 1)
            .map(|(path, branches)| (path.to_string(), branches))
            .collect();
        overlaps.sort();
        overlaps
    }
}

impl<B: Into<String>> FromIterator<(B, Vec<String>)> for BranchAssignment {
    fn from_iter<I: IntoIterator<Item = (B, Vec<String>)>>(iter: I) -> Self {
        Self {
            branches: iter
                .into_iter()
                .map(|(branch, files)| (branch.into(), files))
                .collect(),
        }
    }
}
