//! Pull-time conflicts: the three-way merge used to replay local edits, and
//! the persisted marker that blocks other commands until `resolve`.

pub mod marker;
pub mod merger;

pub use marker::{ConflictMarker, ConflictStore, SyncState};
pub use merger::{MergeResult, Merger};
