//! Pull the remote mainline underneath uncommitted local edits.
//!
//! Local edits are snapshotted together with their pre-pull base content,
//! stashed (untracked files included), the mainline is pulled, and every
//! edit is merged back onto whatever the pull left in the working tree.
//! The stash is only dropped once every path has been written back.

use tracing::{debug, info, instrument, warn};

use super::client::{GitClient, WorktreeFile};
use crate::conflict::Merger;
use crate::errors::GitError;

const STASH_REF: &str = "refs/stash";

/// One uncommitted path captured before the pull. Staged-only edits are
/// captured too, since the stash takes them with it.
#[derive(Debug)]
struct LocalEdit {
    path: String,
    /// Content at `HEAD` before the pull; `None` for untracked files.
    base: Option<Vec<u8>>,
    /// Working-tree content; `None` when the file was deleted locally.
    local: Option<WorktreeFile>,
}

/// Outcome of replaying a single path.
#[derive(Debug, PartialEq, Eq)]
enum Replayed {
    Clean,
    Conflict,
}

#[instrument(skip(client))]
pub(crate) fn pull_and_replay(
    client: &GitClient,
    remote: &str,
    mainline: &str,
) -> Result<Vec<String>, GitError> {
    let edits = snapshot_local_edits(client)?;

    let stash_before = client.repo().refname_to_id(STASH_REF).ok();
    if !edits.is_empty() {
        client.run_git(&["stash", "push", "--include-untracked", "-m", "gg pull"])?;
    }
    let stash_after = client.repo().refname_to_id(STASH_REF).ok();
    let stashed = stash_after.is_some() && stash_after != stash_before;

    if let Err(e) = client.run_git(&["pull", "--no-edit", remote, mainline]) {
        if stashed {
            warn!("pull failed; local edits are kept in stash@{{0}}");
        }
        return Err(e);
    }
    info!(remote, mainline, edits = edits.len(), "pulled mainline, replaying local edits");

    let mut conflicts = Vec::new();
    for edit in &edits {
        if replay_edit(client, edit)? == Replayed::Conflict {
            conflicts.push(format!("Conflict: {}", edit.path));
        }
    }

    if stashed {
        client.run_git(&["stash", "drop", "stash@{0}"])?;
    }
    if !conflicts.is_empty() {
        warn!(count = conflicts.len(), "replay left conflicts");
    }
    Ok(conflicts)
}

fn snapshot_local_edits(client: &GitClient) -> Result<Vec<LocalEdit>, GitError> {
    let head_tree = client.resolve_tree("HEAD")?;
    client
        .stashable_paths()?
        .into_iter()
        .map(|path| {
            Ok(LocalEdit {
                base: client.blob_in_tree(&head_tree, &path)?,
                local: client.read_worktree_file(&path)?,
                path,
            })
        })
        .collect()
}

fn replay_edit(client: &GitClient, edit: &LocalEdit) -> Result<Replayed, GitError> {
    let incoming = client.read_worktree_file(&edit.path)?;

    match (&edit.local, incoming) {
        // Deleted locally.
        (None, None) => Ok(Replayed::Clean),
        (None, Some(incoming)) => {
            if edit.base.as_deref() == Some(incoming.content.as_slice()) {
                client.remove_worktree_file(&edit.path)?;
                Ok(Replayed::Clean)
            } else {
                debug!(path = %edit.path, "deleted locally but changed upstream");
                Ok(Replayed::Conflict)
            }
        }
        // Not present after the pull: restore the local version.
        (Some(local), None) => {
            client.write_worktree_file(&edit.path, local)?;
            let upstream_deleted = edit
                .base
                .as_deref()
                .is_some_and(|base| base != local.content.as_slice());
            if upstream_deleted {
                debug!(path = %edit.path, "modified locally but deleted upstream");
                return Ok(Replayed::Conflict);
            }
            Ok(Replayed::Clean)
        }
        // Present on both sides. Without a base snapshot both sides added the
        // file independently, so merge against an empty ancestor.
        (Some(local), Some(incoming)) => {
            let base = edit.base.as_deref().unwrap_or_default();
            let result = Merger::three_way_merge(base, &local.content, &incoming.content);
            let merged = WorktreeFile {
                content: result.merged_content,
                mode: local.mode,
            };
            client.write_worktree_file(&edit.path, &merged)?;
            if result.has_conflicts {
                debug!(path = %edit.path, regions = result.conflict_regions, "merge conflict");
                Ok(Replayed::Conflict)
            } else {
                Ok(Replayed::Clean)
            }
        }
    }
}
