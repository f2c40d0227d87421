//! Git operations for gg.

pub mod client;
mod replay;
pub mod vcs;

pub use client::{GitClient, WorktreeFile};
pub use vcs::{Vcs, WorkingTreeDiff};
