//! Core task store for taskheat.
//! This crate is the single source of truth for task invariants, ordering
//! rules and persistence.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::clock::{Clock, ManualClock, SystemClock};
pub use model::ids::{IdAllocator, IdWatermarks, SubtaskId, TaskId};
pub use model::subtask::{Subtask, SubtaskData};
pub use model::tag::{Tag, TagData};
pub use model::task::{Task, TaskData};
pub use model::validation::ValidationError;
pub use query::{query_tasks, QueryMode, SortMode};
pub use repo::snapshot_repo::{
    PersistResult, PersistenceError, SqliteFilePersistence, TaskPersistence, TaskSnapshot,
};
pub use service::autosave::{AutosaveError, AutosaveStatus, AutosaveWorker};
pub use service::task_store::{StoreError, StoreResult, TaskEdit, TaskStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
