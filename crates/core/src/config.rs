//! Configuration for gg.
//!
//! Every field has a default, so a working tree without a `.gg.toml` behaves
//! exactly like one with an empty file.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

/// Name of the optional configuration file at the working-tree root.
pub const CONFIG_FILE_NAME: &str = ".gg.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Settings shared by every gg command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GgConfig {
    /// The base branch every logical PR branch is compared against.
    pub mainline: String,

    /// Reserved pseudo-branch for modified files no branch has claimed yet.
    pub catch_all: String,

    /// Remote used by `pull` and `push-all`.
    pub remote: String,

    /// Assignment file, relative to the working-tree root.
    pub assignment_file: PathBuf,

    /// Conflict marker file, relative to the working-tree root.
    pub conflict_file: PathBuf,

    /// Minimum tracing level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GgConfig {
    fn default() -> Self {
        Self {
            mainline: "main".into(),
            catch_all: "UNTRACKED".into(),
            remote: "origin".into(),
            assignment_file: PathBuf::from(".gg.txt"),
            conflict_file: PathBuf::from(".gg-conflicts.txt"),
            log_level: "warn".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl GgConfig {
    /// Load a [`GgConfig`] from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        info!(path = %path.display(), "loading configuration");
        let contents = std::fs::read_to_string(path)?;
        let config: GgConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(config)
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that names are non-empty and persisted paths stay inside
    /// the working tree.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("mainline", &self.mainline),
            ("catch_all", &self.catch_all),
            ("remote", &self.remote),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must not be empty".into(),
                });
            }
        }
        if self.catch_all == self.mainline {
            return Err(ConfigError::InvalidValue {
                field: "catch_all".into(),
                detail: format!("must differ from mainline '{}'", self.mainline),
            });
        }
        for (field, path) in [
            ("assignment_file", &self.assignment_file),
            ("conflict_file", &self.conflict_file),
        ] {
            if !is_contained_relative(path) {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: format!(
                        "'{}' must be a relative path inside the working tree",
                        path.display()
                    ),
                });
            }
        }
        if self.assignment_file == self.conflict_file {
            return Err(ConfigError::InvalidValue {
                field: "conflict_file".into(),
                detail: "must differ from assignment_file".into(),
            });
        }
        Ok(())
    }

    /// `true` for names that are never treated as logical PR branches.
    pub fn is_reserved_branch(&self, name: &str) -> bool {
        name == self.mainline || name == self.catch_all
    }

    /// Write the default template to `path`, refusing to overwrite.
    pub fn write_template<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.display().to_string()));
        }
        std::fs::write(path, Self::default_template())?;
        info!(path = %path.display(), "wrote default configuration");
        Ok(())
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# gg configuration
# All keys are optional; the values below are the defaults.

# Base branch every logical PR branch is diffed against.
mainline = "main"

# Pseudo-branch collecting modified files no branch has claimed.
catch_all = "UNTRACKED"

# Remote used by `gg pull` and `gg push-all`.
remote = "origin"

# Persisted state, relative to the working-tree root.
assignment_file = ".gg.txt"
conflict_file = ".gg-conflicts.txt"

# trace, debug, info, warn, error (GG_LOG overrides).
log_level = "warn"
"#
    }
}

fn is_contained_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
