//! Persisted branch assignment (`.gg.txt`).
//!
//! The file is the user-editable source of truth between reconciliation
//! runs. Each branch is a `# <branch>` header followed by one path per line
//! and a blank separator line:
//!
//! ```text
//! # feature-a
//! src/a.rs
//! src/b.rs
//!
//! # feature-b
//! docs/b.md
//!
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::assignment::BranchAssignment;
use crate::errors::AssignmentError;

/// Reads and writes the persisted [`BranchAssignment`].
#[derive(Debug, Clone)]
pub struct AssignmentStore {
    path: PathBuf,
}

impl AssignmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Parse the assignment file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<BranchAssignment, AssignmentError> {
        let contents = std::fs::read_to_string(&self.path)?;
        let assignment = parse_assignment(&contents, &self.path.display().to_string())?;
        for (path, branches) in assignment.overlaps() {
            warn!(%path, ?branches, "file is assigned to more than one branch");
        }
        debug!(branches = assignment.len(), "loaded branch assignment");
        Ok(assignment)
    }

    /// Replace the assignment file with `assignment`.
    ///
    /// The content is written to a temporary file next to the target and
    /// renamed over it, so readers never see a partial file.
    #[instrument(skip(self, assignment), fields(path = %self.path.display()))]
    pub fn save(&self, assignment: &BranchAssignment) -> Result<(), AssignmentError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(render_assignment(assignment).as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        info!(branches = assignment.len(), "saved branch assignment");
        Ok(())
    }

    /// Move `path` to the end of `branch`'s list and persist the result.
    /// A missing assignment file starts out empty.
    ///
    /// Only the persisted intent changes; nothing is committed until the
    /// next reconciliation.
    #[instrument(skip(self), fields(store = %self.path.display()))]
    pub fn reassign(&self, path: &str, branch: &str) -> Result<BranchAssignment, AssignmentError> {
        let mut assignment = if self.exists() {
            self.load()?
        } else {
            BranchAssignment::new()
        };
        let previous = assignment.owner_of(path).map(str::to_string);
        assignment.reassign(path, branch);
        self.save(&assignment)?;
        info!(file = path, from = ?previous, to = branch, "reassigned file");
        Ok(assignment)
    }
}

/// Parse the textual assignment format. `source` names the file in errors.
///
/// Headers are `# <branch>`; a line such as `#notes.md` is a path.
pub fn parse_assignment(contents: &str, source: &str) -> Result<BranchAssignment, AssignmentError> {
    let mut assignment = BranchAssignment::new();
    let mut current: Option<String> = None;

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        // Trimming turns a bare "# " into "#".
        if line == "#" {
            return Err(AssignmentError::EmptyBranchName {
                file: source.to_string(),
                line_no: idx + 1,
            });
        }
        if let Some(header) = line.strip_prefix("# ") {
            let name = header.trim();
            if assignment.contains_branch(name) {
                warn!(branch = name, line_no = idx + 1, "branch header repeated, merging entries");
            }
            assignment.ensure_branch(name);
            current = Some(name.to_string());
            continue;
        }
        match &current {
            Some(branch) => assignment.ensure_branch(branch).push(line.to_string()),
            None => {
                return Err(AssignmentError::PathBeforeHeader {
                    file: source.to_string(),
                    line_no: idx + 1,
                    line: line.to_string(),
                })
            }
        }
    }

    Ok(assignment)
}

/// Render an assignment in the persisted format, branches in iteration order.
pub fn render_assignment(assignment: &BranchAssignment) -> String {
    let mut out = String::new();
    for (branch, files) in assignment.iter() {
        out.push_str("# ");
        out.push_str(branch);
        out.push('\n');
        for file in files {
            out.push_str(file);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
