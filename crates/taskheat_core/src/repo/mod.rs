//! Persistence layer for the task collection.
//!
//! # Responsibility
//! - Define the storage contract (`TaskPersistence`) the store and autosave
//!   worker depend on.
//! - Keep SQLite snapshot details inside the persistence boundary.
//!
//! # Invariants
//! - A snapshot is always written and read as a whole; there are no partial
//!   updates of individual tasks.

pub mod snapshot_repo;
