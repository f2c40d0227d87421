//! Error types for the gg core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`GgError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum GgError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from the version-control gateway.
///
/// Every variant is fatal: nothing in the engine retries or recovers from a
/// failed git operation.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path does not exist or is not inside a git working tree.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A `git` subprocess exited with a non-zero status.
    #[error("`{command}` failed (exit {exit_code}):\n{stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A ref (branch, SHA, `HEAD`) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// Refused to create a branch that already exists.
    #[error("branch '{0}' already exists")]
    BranchExists(String),

    /// The repository has no working tree.
    #[error("bare repositories are not supported")]
    BareRepository,

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Assignment file errors
// ---------------------------------------------------------------------------

/// Errors from reading or writing the persisted branch assignment.
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// A file path line appeared before any `# <branch>` header.
    #[error("{file}:{line_no}: path '{line}' appears before any branch header")]
    PathBeforeHeader {
        file: String,
        line_no: usize,
        line: String,
    },

    /// A header line without a branch name.
    #[error("{file}:{line_no}: empty branch name in header")]
    EmptyBranchName { file: String, line_no: usize },

    /// Files cannot be assigned to the mainline.
    #[error("'{0}' is the mainline and cannot own files")]
    ReservedBranch(String),

    /// Generic I/O error.
    #[error("assignment file I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Conflict state errors
// ---------------------------------------------------------------------------

/// Errors from the cross-invocation conflict state.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// A clean-state operation was attempted while a conflict is pending.
    #[error(
        "conflict resolution in progress (base {merge_base}); \
         fix the conflicting files, then run `gg resolve`"
    )]
    ConflictPending { merge_base: String },

    /// `resolve` was invoked with no conflict marker on disk.
    #[error("no conflict resolution in progress: '{0}' does not exist")]
    MarkerMissing(String),

    /// The conflict marker exists but carries no merge-base.
    #[error("conflict marker '{path}' is malformed: {detail}")]
    MarkerMalformed { path: String, detail: String },

    /// Generic I/O error.
    #[error("conflict marker I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Refused to overwrite an existing file.
    #[error("configuration file already exists: {0}")]
    AlreadyExists(String),

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GitError::RepositoryNotFound("/tmp/repo".into());
        assert_eq!(err.to_string(), "git repository not found at '/tmp/repo'");

        let err = GitError::CommandFailed {
            command: "git push origin main".into(),
            exit_code: 128,
            stderr: "fatal: no remote".into(),
        };
        assert!(err.to_string().contains("exit 128"));
        assert!(err.to_string().contains("fatal: no remote"));

        let err = AssignmentError::PathBeforeHeader {
            file: ".gg.txt".into(),
            line_no: 1,
            line: "a.txt".into(),
        };
        assert_eq!(
            err.to_string(),
            ".gg.txt:1: path 'a.txt' appears before any branch header"
        );

        let err = ConflictError::ConflictPending {
            merge_base: "abc123".into(),
        };
        assert!(err.to_string().contains("gg resolve"));
    }

    #[test]
    fn test_gg_error_from_subsystem() {
        let err: GgError = ConflictError::MarkerMissing(".gg-conflicts.txt".into()).into();
        assert!(matches!(err, GgError::Conflict(_)));

        let err: GgError = GitError::BranchExists("feature".into()).into();
        assert!(matches!(err, GgError::Git(_)));
    }
}
