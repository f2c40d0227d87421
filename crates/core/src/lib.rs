//! gg core library.
//!
//! Partitions the files of one working tree across logical PR branches,
//! persists the assignment, and reconciles it into at most one commit per
//! branch. Also hosts the pull/replay flow and the conflict state that
//! gates it.

pub mod assignment;
pub mod config;
pub mod conflict;
pub mod derive;
pub mod errors;
pub mod git;
pub mod reconcile;
pub mod store;
pub mod sync_engine;

#[cfg(test)]
mod testing;

// Re-exports for convenience.
pub use assignment::BranchAssignment;
pub use config::GgConfig;
pub use errors::GgError;
pub use git::{GitClient, Vcs};
pub use reconcile::{BranchOutcome, ReconcileReport};
pub use sync_engine::{PullOutcome, StatusReport, SyncEngine};
