//! Local Git repository operations via `git2`, with the network-facing
//! commands (`push`, `pull`, `stash`) delegated to the `git` binary so the
//! user's remotes, credential helpers and hooks apply unchanged.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use git2::build::TreeUpdateBuilder;
use git2::{
    BranchType, ErrorCode, FileMode, ObjectType, Oid, Repository, Status, StatusOptions, Tree,
};
use tracing::{debug, info, instrument, warn};

use super::replay;
use super::vcs::{Vcs, WorkingTreeDiff};
use crate::errors::GitError;

const WORKTREE_CHANGES: Status = Status::WT_NEW
    .union(Status::WT_MODIFIED)
    .union(Status::WT_DELETED)
    .union(Status::WT_TYPECHANGE)
    .union(Status::WT_RENAMED);

const INDEX_CHANGES: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

/// High-level Git client wrapping a `git2::Repository` with a working tree.
pub struct GitClient {
    repo: Repository,
    workdir: PathBuf,
}

/// A file as it currently exists in the working tree.
#[derive(Debug, Clone)]
pub struct WorktreeFile {
    pub content: Vec<u8>,
    pub mode: FileMode,
}

impl GitClient {
    /// Open the repository whose working tree is exactly `repo_path`.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Self::from_repo(repo)
    }

    /// Open the repository containing `path`, searching parent directories.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::discover(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Self::from_repo(repo)
    }

    fn from_repo(repo: Repository) -> Result<Self, GitError> {
        let workdir = repo.workdir().ok_or(GitError::BareRepository)?.to_path_buf();
        info!(path = %workdir.display(), "opened git repository");
        Ok(Self { repo, workdir })
    }

    /// Root of the working tree.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Resolve any commit-ish to its tree.
    pub fn resolve_tree(&self, spec: &str) -> Result<Tree<'_>, GitError> {
        let object = self.repo.revparse_single(spec).map_err(|e| not_found_as_ref(e, spec))?;
        Ok(object.peel_to_tree()?)
    }

    /// Resolve any commit-ish to a commit id.
    pub fn resolve_commit(&self, spec: &str) -> Result<Oid, GitError> {
        let object = self.repo.revparse_single(spec).map_err(|e| not_found_as_ref(e, spec))?;
        Ok(object.peel_to_commit()?.id())
    }

    /// Content of `path` in `tree`, or `None` when the tree has no blob there.
    pub fn blob_in_tree(&self, tree: &Tree<'_>, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }
        let blob = entry.to_object(&self.repo)?.peel_to_blob()?;
        Ok(Some(blob.content().to_vec()))
    }

    /// Read `path` from the working tree; `None` if it does not exist.
    pub fn read_worktree_file(&self, path: &str) -> Result<Option<WorktreeFile>, GitError> {
        let abs = self.workdir.join(path);
        let meta = match std::fs::symlink_metadata(&abs) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&abs)?;
            return Ok(Some(WorktreeFile {
                content: target.as_os_str().as_encoded_bytes().to_vec(),
                mode: FileMode::Link,
            }));
        }
        if meta.is_dir() {
            return Ok(None);
        }
        let mode = if is_executable(&meta) {
            FileMode::BlobExecutable
        } else {
            FileMode::Blob
        };
        Ok(Some(WorktreeFile {
            content: std::fs::read(&abs)?,
            mode,
        }))
    }

    /// Write `file` at `path` in the working tree, creating parent
    /// directories as needed.
    pub fn write_worktree_file(&self, path: &str, file: &WorktreeFile) -> Result<(), GitError> {
        let abs = self.workdir.join(path);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if matches!(file.mode, FileMode::Link) {
            return write_symlink(&abs, &file.content);
        }
        std::fs::write(&abs, &file.content)?;
        set_executable(&abs, matches!(file.mode, FileMode::BlobExecutable))?;
        Ok(())
    }

    /// Remove `path` from the working tree if present.
    pub fn remove_worktree_file(&self, path: &str) -> Result<(), GitError> {
        match std::fs::remove_file(self.workdir.join(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every path `git stash push --include-untracked` captures: working-tree
    /// changes, untracked files and staged changes. Sorted.
    pub(crate) fn stashable_paths(&self) -> Result<Vec<String>, GitError> {
        self.status_paths(WORKTREE_CHANGES | INDEX_CHANGES)
    }

    fn status_paths(&self, wanted: Status) -> Result<Vec<String>, GitError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut paths: Vec<String> = statuses
            .iter()
            .filter(|entry| entry.status().intersects(wanted))
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Run `git` in the working tree, returning stdout.
    pub(crate) fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        let command = format!("git {}", args.join(" "));
        debug!(cmd = %command, "running git command");
        let output = Command::new("git")
            .current_dir(&self.workdir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GitError::BinaryNotFound("git".into())
                } else {
                    GitError::IoError(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, %stderr, cmd = %command, "git command failed");
            return Err(GitError::CommandFailed {
                command,
                exit_code,
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Vcs for GitClient {
    fn list_branches(&self) -> Result<Vec<String>, GitError> {
        let branches = self.repo.branches(Some(BranchType::Local))?;
        let mut names = Vec::new();
        for branch_result in branches {
            let (branch, _) = branch_result?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn list_modified_and_untracked(&self) -> Result<Vec<String>, GitError> {
        let paths = self.status_paths(WORKTREE_CHANGES)?;
        debug!(count = paths.len(), "listed modified and untracked files");
        Ok(paths)
    }

    fn diff_paths(&self, from: &str, to: &str) -> Result<Vec<String>, GitError> {
        let old_tree = self.resolve_tree(from)?;
        let new_tree = self.resolve_tree(to)?;
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;
        let paths: Vec<String> = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.to_string_lossy().into_owned())
            })
            .collect();
        debug!(from, to, count = paths.len(), "diffed trees");
        Ok(paths)
    }

    fn working_tree_diff(&self, branch: &str, path: &str) -> Result<WorkingTreeDiff, GitError> {
        let tree = self.resolve_tree(branch)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            // Absent on both sides: nothing to record.
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Ok(match self.read_worktree_file(path)? {
                    Some(_) => WorkingTreeDiff::MissingOnBranch,
                    None => WorkingTreeDiff::Same,
                });
            }
            Err(e) => return Err(e.into()),
        };
        let Some(file) = self.read_worktree_file(path)? else {
            return Ok(WorkingTreeDiff::Differs);
        };
        let oid = Oid::hash_object(ObjectType::Blob, &file.content)?;
        if entry.id() == oid && entry.filemode() == mode_bits(file.mode) {
            Ok(WorkingTreeDiff::Same)
        } else {
            Ok(WorkingTreeDiff::Differs)
        }
    }

    #[instrument(skip(self))]
    fn create_branch(&self, name: &str) -> Result<(), GitError> {
        if self.repo.find_branch(name, BranchType::Local).is_ok() {
            return Err(GitError::BranchExists(name.to_string()));
        }
        let head = self.repo.head()?.peel_to_commit()?;
        self.repo.branch(name, &head, false)?;
        info!(name, from = %head.id(), "created branch");
        Ok(())
    }

    #[instrument(skip(self, files, restore, message), fields(files = files.len()))]
    fn commit_files(
        &self,
        branch: &str,
        files: &[String],
        restore: &[String],
        base: &str,
        message: &str,
    ) -> Result<Oid, GitError> {
        let refname = format!("refs/heads/{}", branch);
        let parent = self
            .repo
            .find_reference(&refname)
            .map_err(|e| not_found_as_ref(e, &refname))?
            .peel_to_commit()?;
        let branch_tree = parent.tree()?;

        let mut builder = TreeUpdateBuilder::new();
        for file in files {
            match self.read_worktree_file(file)? {
                Some(wt) => {
                    let blob = self.repo.blob(&wt.content)?;
                    builder.upsert(file.as_str(), blob, wt.mode);
                }
                // Removing a path absent from the branch tree is an error in
                // libgit2, and there is nothing to remove anyway.
                None if branch_tree.get_path(Path::new(file)).is_ok() => {
                    builder.remove(file.as_str());
                }
                None => debug!(file = %file, "missing from working tree and branch, skipping"),
            }
        }
        if !restore.is_empty() {
            let restore_tree = self.resolve_tree(base)?;
            for file in restore {
                match restore_tree.get_path(Path::new(file)) {
                    Ok(entry) => {
                        builder.upsert(file.as_str(), entry.id(), file_mode(entry.filemode()));
                    }
                    Err(e) if e.code() != ErrorCode::NotFound => return Err(e.into()),
                    Err(_) if branch_tree.get_path(Path::new(file)).is_ok() => {
                        builder.remove(file.as_str());
                    }
                    Err(_) => {}
                }
            }
            debug!(base, count = restore.len(), "restored dropped files");
        }
        let tree_oid = builder.create_updated(&self.repo, &branch_tree)?;
        let tree = self.repo.find_tree(tree_oid)?;

        let signature = self.repo.signature()?;
        let oid = self.repo.commit(
            Some(&refname),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;
        info!(branch, sha = %oid, parent = %parent.id(), "created commit");
        Ok(oid)
    }

    #[instrument(skip(self))]
    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        self.run_git(&["push", remote, &refspec])?;
        info!(remote, branch, "push completed");
        Ok(())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Oid, GitError> {
        let a_oid = self.resolve_commit(a)?;
        let b_oid = self.resolve_commit(b)?;
        Ok(self.repo.merge_base(a_oid, b_oid)?)
    }

    #[instrument(skip(self))]
    fn pull_and_replay(&self, remote: &str, mainline: &str) -> Result<Vec<String>, GitError> {
        replay::pull_and_replay(self, remote, mainline)
    }
}

/// Raw tree-entry mode for a working-tree file mode.
fn mode_bits(mode: FileMode) -> i32 {
    match mode {
        FileMode::BlobExecutable => 0o100755,
        FileMode::Link => 0o120000,
        FileMode::Tree => 0o040000,
        FileMode::Commit => 0o160000,
        _ => 0o100644,
    }
}

/// Inverse of [`mode_bits`] for modes read from a tree entry.
fn file_mode(bits: i32) -> FileMode {
    match bits {
        0o100755 => FileMode::BlobExecutable,
        0o120000 => FileMode::Link,
        0o160000 => FileMode::Commit,
        _ => FileMode::Blob,
    }
}

fn not_found_as_ref(err: git2::Error, spec: &str) -> GitError {
    if err.code() == ErrorCode::NotFound {
        GitError::RefNotFound(spec.to_string())
    } else {
        GitError::Git2Error(err)
    }
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn set_executable(path: &Path, executable: bool) -> Result<(), GitError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    let mode = perms.mode();
    perms.set_mode(if executable { mode | 0o111 } else { mode & !0o111 });
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path, _executable: bool) -> Result<(), GitError> {
    Ok(())
}

#[cfg(unix)]
fn write_symlink(path: &Path, target: &[u8]) -> Result<(), GitError> {
    use std::os::unix::ffi::OsStrExt;
    if std::fs::symlink_metadata(path).is_ok() {
        std::fs::remove_file(path)?;
    }
    std::os::unix::fs::symlink(std::ffi::OsStr::from_bytes(target), path)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_symlink(path: &Path, target: &[u8]) -> Result<(), GitError> {
    std::fs::write(path, target)?;
    Ok(())
}
