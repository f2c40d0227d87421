//! Cross-invocation conflict state (`.gg-conflicts.txt`).
//!
//! The first line of the marker file is the merge-base that was current
//! before the pull; every following line is a conflict report line from
//! the replay. Its presence alone means a conflict is pending.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::ConflictError;

/// Persisted record of an unresolved pull-time conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictMarker {
    /// Merge-base in effect immediately before the pull began.
    pub merge_base: String,
    /// Conflict report lines, verbatim.
    pub conflicts: Vec<String>,
}

impl ConflictMarker {
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(&self.merge_base);
        out.push('\n');
        for line in &self.conflicts {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Parse marker file contents; `source` names the file in errors.
    pub fn parse(contents: &str, source: &str) -> Result<Self, ConflictError> {
        let mut lines = contents.lines();
        let merge_base = lines
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ConflictError::MarkerMalformed {
                path: source.to_string(),
                detail: "first line must hold the pre-pull merge-base".into(),
            })?
            .to_string();
        let conflicts = lines
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self {
            merge_base,
            conflicts,
        })
    }
}

/// Whether the working tree is free for commit/push/pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Clean,
    ConflictPending(ConflictMarker),
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::ConflictPending(_) => write!(f, "conflict_pending"),
        }
    }
}

/// Owns the marker file and every transition of [`SyncState`].
#[derive(Debug, Clone)]
pub struct ConflictStore {
    path: PathBuf,
}

impl ConflictStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state, read from disk.
    pub fn state(&self) -> Result<SyncState, ConflictError> {
        if !self.path.exists() {
            return Ok(SyncState::Clean);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let marker = ConflictMarker::parse(&contents, &self.path.display().to_string())?;
        Ok(SyncState::ConflictPending(marker))
    }

    /// The single guard for every operation that needs a clean state.
    pub fn ensure_clean(&self) -> Result<(), ConflictError> {
        if !self.path.exists() {
            return Ok(());
        }
        // A marker we cannot even parse still blocks the operation.
        let merge_base = match self.state() {
            Ok(SyncState::ConflictPending(marker)) => marker.merge_base,
            _ => "unknown".to_string(),
        };
        Err(ConflictError::ConflictPending { merge_base })
    }

    /// Clean → ConflictPending.
    pub fn record(&self, marker: &ConflictMarker) -> Result<(), ConflictError> {
        self.ensure_clean()?;
        std::fs::write(&self.path, marker.render())?;
        info!(
            path = %self.path.display(),
            base = %marker.merge_base,
            conflicts = marker.conflicts.len(),
            "recorded pending conflict"
        );
        Ok(())
    }

    /// ConflictPending → Clean. Returns the marker that was consumed.
    pub fn take(&self) -> Result<ConflictMarker, ConflictError> {
        if !self.path.exists() {
            return Err(ConflictError::MarkerMissing(self.path.display().to_string()));
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let marker = ConflictMarker::parse(&contents, &self.path.display().to_string())?;
        std::fs::remove_file(&self.path)?;
        debug!(base = %marker.merge_base, "consumed conflict marker");
        Ok(marker)
    }
}
