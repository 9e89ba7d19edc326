//! Resolved store configuration.
//!
//! The core never reads settings files; shells resolve a `StoreConfig`
//! (usually by deserializing their settings document) and hand it over.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default snapshot location, relative to the working directory.
pub const DEFAULT_TASK_SAVE_PATH: &str = "./tasks-saving.data";
/// Default bound of the autosave request queue.
pub const DEFAULT_AUTOSAVE_QUEUE_CAPACITY: usize = 64;

/// Settings consumed by `TaskStore`.
///
/// Field names use camelCase on the wire to stay compatible with existing
/// `settings.json` files; every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Snapshot file path.
    pub task_save_path: PathBuf,
    /// Persist after every mutation when `true`.
    pub auto_save: bool,
    /// Pending save requests allowed before mutations wait for the worker.
    pub autosave_queue_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            task_save_path: PathBuf::from(DEFAULT_TASK_SAVE_PATH),
            auto_save: true,
            autosave_queue_capacity: DEFAULT_AUTOSAVE_QUEUE_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Creates a config for `task_save_path` with other fields defaulted.
    pub fn at(task_save_path: impl Into<PathBuf>) -> Self {
        Self {
            task_save_path: task_save_path.into(),
            ..Self::default()
        }
    }

    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save = enabled;
        self
    }
}
