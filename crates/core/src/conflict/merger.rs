//! Three-way merge engine used when replaying local edits after a pull.
//!
//! Uses the `diffy` crate to merge a base, "ours" (the local, stashed edit)
//! and "theirs" (the content that arrived with the pull).

use tracing::debug;

/// The result of a three-way merge attempt.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// The merged content (contains conflict markers if `has_conflicts`).
    pub merged_content: Vec<u8>,
    /// Whether the merge completed without conflicts.
    pub has_conflicts: bool,
    /// Number of `<<<<<<<` conflict regions in `merged_content`.
    pub conflict_regions: usize,
}

impl MergeResult {
    fn clean(content: &[u8]) -> Self {
        Self {
            merged_content: content.to_vec(),
            has_conflicts: false,
            conflict_regions: 0,
        }
    }
}

/// Stateless three-way merge engine.
pub struct Merger;

impl Merger {
    /// Merge `ours` and `theirs`, both derived from `base`.
    ///
    /// Always returns content. A clean merge has `has_conflicts == false`;
    /// otherwise standard `<<<<<<<` / `|||||||` / `=======` / `>>>>>>>`
    /// markers are embedded.
    pub fn three_way_merge(base: &[u8], ours: &[u8], theirs: &[u8]) -> MergeResult {
        // Either side unchanged: the other side wins cleanly.
        if ours == base {
            debug!("ours == base, theirs wins cleanly");
            return MergeResult::clean(theirs);
        }
        if theirs == base || ours == theirs {
            debug!("theirs == base or identical changes, ours wins cleanly");
            return MergeResult::clean(ours);
        }

        match diffy::merge_bytes(base, ours, theirs) {
            Ok(merged) => {
                debug!("clean three-way merge");
                MergeResult {
                    merged_content: merged,
                    has_conflicts: false,
                    conflict_regions: 0,
                }
            }
            Err(conflicted) => {
                let conflict_regions = count_conflict_regions(&conflicted);
                debug!(conflict_regions, "three-way merge produced conflicts");
                MergeResult {
                    merged_content: conflicted,
                    has_conflicts: true,
                    conflict_regions: conflict_regions.max(1),
                }
            }
        }
    }
}

fn count_conflict_regions(content: &[u8]) -> usize {
    content
        .split(|b| *b == b'\n')
        .filter(|line| line.starts_with(b"<<<<<<<"))
        .count()
}
