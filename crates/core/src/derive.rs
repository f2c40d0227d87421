//! Derive the branch assignment that is committed today.
//!
//! Each logical PR branch owns the paths that differ between the base and
//! its tip. Whatever is modified or untracked in the working tree and not
//! owned by any branch lands in the catch-all bucket. The bucket is always
//! recomputed from git and never treated as authoritative.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, instrument};

use crate::assignment::BranchAssignment;
use crate::config::GgConfig;
use crate::errors::GitError;
use crate::git::Vcs;

/// Compute the branch → files assignment as committed relative to `base`.
///
/// Branches are listed in the order git reports them, followed by the
/// catch-all bucket (sorted). gg's own state files never appear in it.
#[instrument(skip(vcs, config))]
pub fn derive_assignment<V: Vcs>(
    vcs: &V,
    config: &GgConfig,
    base: &str,
) -> Result<BranchAssignment, GitError> {
    let mut assignment = BranchAssignment::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for branch in vcs.list_branches()? {
        if config.is_reserved_branch(&branch) {
            continue;
        }
        let files = vcs.diff_paths(base, &branch)?;
        debug!(branch = %branch, files = files.len(), "branch differs from base");
        claimed.extend(files.iter().cloned());
        assignment.set_files(branch, files);
    }

    let mut unclaimed: Vec<String> = vcs
        .list_modified_and_untracked()?
        .into_iter()
        .filter(|path| !claimed.contains(path) && !is_state_file(config, path))
        .collect();
    unclaimed.sort();
    unclaimed.dedup();
    debug!(count = unclaimed.len(), "unclaimed files");
    assignment.set_files(config.catch_all.clone(), unclaimed);

    Ok(assignment)
}

fn is_state_file(config: &GgConfig, path: &str) -> bool {
    let path = Path::new(path);
    path == config.assignment_file || path == config.conflict_file
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeVcs;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_catch_all_gets_only_unclaimed_files() {
        let vcs = FakeVcs::new()
            .with_branch("main", &[])
            .with_branch("feature-a", &["x.txt"])
            .with_branch("feature-b", &["y.txt"])
            .with_modified(&["x.txt", "z.txt", ".gg.txt"]);
        let config = GgConfig::default();

        let derived = derive_assignment(&vcs, &config, "main").unwrap();

        assert_eq!(derived.files("feature-a"), files(&["x.txt"]).as_slice());
        assert_eq!(derived.files("feature-b"), files(&["y.txt"]).as_slice());
        assert_eq!(derived.files("UNTRACKED"), files(&["z.txt"]).as_slice());
        assert!(!derived.contains_branch("main"));
        let order: Vec<&str> = derived.branch_names().collect();
        assert_eq!(order, vec!["feature-a", "feature-b", "UNTRACKED"]);
    }

    #[test]
    fn test_catch_all_completeness_without_overlap() {
        let vcs = FakeVcs::new()
            .with_branch("main", &[])
            .with_branch("feature-a", &["a.txt", "shared/b.txt"])
            .with_modified(&["a.txt", "c.txt", "shared/b.txt", "d.txt"]);
        let config = GgConfig::default();

        let derived = derive_assignment(&vcs, &config, "main").unwrap();

        let mut union: Vec<String> = derived.iter().flat_map(|(_, f)| f.to_vec()).collect();
        union.sort();
        let total: usize = derived.iter().map(|(_, f)| f.len()).sum();
        assert_eq!(total, union.len());
        assert_eq!(union, files(&["a.txt", "c.txt", "d.txt", "shared/b.txt"]));
        assert!(derived.overlaps().is_empty());
    }

    #[test]
    fn test_existing_catch_all_branch_is_ignored() {
        let vcs = FakeVcs::new()
            .with_branch("main", &[])
            .with_branch("UNTRACKED", &["stale.txt"])
            .with_modified(&["new.txt"]);
        let derived = derive_assignment(&vcs, &GgConfig::default(), "main").unwrap();
        assert_eq!(derived.len(), 1);
        assert_eq!(derived.files("UNTRACKED"), files(&["new.txt"]).as_slice());
    }
}
