//! Subtask entity owned by a parent task.

use super::ids::{SubtaskId, TaskId};
use super::validation::{check_completion, ValidationError};
use serde::{Deserialize, Serialize};

/// One step of a task.
///
/// # Invariants
/// - `title` is non-empty and never changes.
/// - `actual_end_time.is_some() == completed`.
/// - `parent_id` is a lookup key only; the owning `Task` holds the subtask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubtaskData", into = "SubtaskData")]
pub struct Subtask {
    id: SubtaskId,
    parent_id: TaskId,
    title: String,
    description: Option<String>,
    completed: bool,
    start_time: i64,
    actual_end_time: Option<i64>,
}

/// Plain wire/storage shape of a subtask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskData {
    pub id: SubtaskId,
    pub parent_id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub completed: bool,
    pub start_time: i64,
    #[serde(default)]
    pub actual_end_time: Option<i64>,
}

impl Subtask {
    /// Creates an incomplete subtask started at `now_ms`.
    pub fn new(
        id: SubtaskId,
        parent_id: TaskId,
        title: impl Into<String>,
        now_ms: i64,
    ) -> Result<Self, ValidationError> {
        Self::try_from(SubtaskData {
            id,
            parent_id,
            title: title.into(),
            description: None,
            completed: false,
            start_time: now_ms,
            actual_end_time: None,
        })
    }

    pub fn id(&self) -> SubtaskId {
        self.id
    }

    pub fn parent_id(&self) -> TaskId {
        self.parent_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn actual_end_time(&self) -> Option<i64> {
        self.actual_end_time
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Marks the subtask done or not done.
    ///
    /// Completing an already completed subtask keeps its first end time.
    pub fn set_completed(&mut self, completed: bool, now_ms: i64) {
        match (self.completed, completed) {
            (false, true) => self.actual_end_time = Some(now_ms),
            (_, false) => self.actual_end_time = None,
            (true, true) => {}
        }
        self.completed = completed;
    }
}

impl TryFrom<SubtaskData> for Subtask {
    type Error = ValidationError;

    fn try_from(value: SubtaskData) -> Result<Self, Self::Error> {
        if value.id.0 <= 0 {
            return Err(ValidationError::NonPositiveSubtaskId(value.id.0));
        }
        if value.parent_id.0 <= 0 {
            return Err(ValidationError::NonPositiveTaskId(value.parent_id.0));
        }
        if value.title.trim().is_empty() {
            return Err(ValidationError::EmptySubtaskTitle);
        }
        check_completion(value.completed, value.actual_end_time)?;

        Ok(Self {
            id: value.id,
            parent_id: value.parent_id,
            title: value.title,
            description: value.description,
            completed: value.completed,
            start_time: value.start_time,
            actual_end_time: value.actual_end_time,
        })
    }
}

impl From<Subtask> for SubtaskData {
    fn from(value: Subtask) -> Self {
        Self {
            id: value.id,
            parent_id: value.parent_id,
            title: value.title,
            description: value.description,
            completed: value.completed,
            start_time: value.start_time,
            actual_end_time: value.actual_end_time,
        }
    }
}
