//! Store services.
//!
//! # Responsibility
//! - Expose the task store façade shells talk to.
//! - Run snapshot persistence on a background worker.
//!
//! # See also
//! - `repo::snapshot_repo` for the on-disk format.

pub mod autosave;
pub mod task_store;
