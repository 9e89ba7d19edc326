//! Task aggregate.
//!
//! # Responsibility
//! - Hold one task and the ordered subtasks it owns.
//! - Keep completion bookkeeping and heat tracking consistent.
//!
//! # Invariants
//! - `id` and `title` never change after creation; `title` is non-empty.
//! - `actual_end_time.is_some() == completed`.
//! - `heat_index` never decreases.
//! - Subtasks keep insertion order, have unique ids and point back at `id`.

use super::ids::{SubtaskId, TaskId};
use super::subtask::{Subtask, SubtaskData};
use super::tag::Tag;
use super::validation::{check_completion, ValidationError};
use serde::{Deserialize, Serialize};

/// A tracked task with a deadline and optional subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskData", into = "TaskData")]
pub struct Task {
    id: TaskId,
    title: String,
    description: Option<String>,
    completed: bool,
    start_time: i64,
    expected_end_time: i64,
    actual_end_time: Option<i64>,
    heat_index: u32,
    tag: Option<Tag>,
    subtasks: Vec<Subtask>,
}

/// Plain wire/storage shape of a task.
///
/// Converting into `Task` runs the same checks as `Task::new`, so persisted or
/// imported data cannot smuggle in broken invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskData {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub completed: bool,
    pub start_time: i64,
    pub expected_end_time: i64,
    #[serde(default)]
    pub actual_end_time: Option<i64>,
    #[serde(default)]
    pub heat_index: u32,
    #[serde(default)]
    pub tag: Option<Tag>,
    #[serde(default)]
    pub subtasks: Vec<SubtaskData>,
}

impl Task {
    /// Creates an incomplete task started at `now_ms`.
    ///
    /// # Errors
    /// - `EmptyTaskTitle` when `title` is blank.
    /// - `NonPositiveTaskId` when `id` was not produced by an allocator.
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        expected_end_time: i64,
        now_ms: i64,
    ) -> Result<Self, ValidationError> {
        Self::try_from(TaskData {
            id,
            title: title.into(),
            description: None,
            completed: false,
            start_time: now_ms,
            expected_end_time,
            actual_end_time: None,
            heat_index: 0,
            tag: None,
            subtasks: Vec::new(),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
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

    pub fn expected_end_time(&self) -> i64 {
        self.expected_end_time
    }

    pub fn actual_end_time(&self) -> Option<i64> {
        self.actual_end_time
    }

    pub fn heat_index(&self) -> u32 {
        self.heat_index
    }

    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    pub fn subtask(&self, id: SubtaskId) -> Option<&Subtask> {
        self.subtasks.iter().find(|subtask| subtask.id() == id)
    }

    pub fn subtask_mut(&mut self, id: SubtaskId) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|subtask| subtask.id() == id)
    }

    /// Returns `(completed, total)` subtask counts.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self
            .subtasks
            .iter()
            .filter(|subtask| subtask.is_completed())
            .count();
        (done, self.subtasks.len())
    }

    /// Returns whether the deadline has passed without completion.
    pub fn is_overdue(&self, now_ms: i64) -> bool {
        !self.completed && now_ms > self.expected_end_time
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn set_expected_end_time(&mut self, expected_end_time: i64) {
        self.expected_end_time = expected_end_time;
    }

    pub fn set_tag(&mut self, tag: Option<Tag>) {
        self.tag = tag;
    }

    /// Marks the task done or not done. Subtasks are left untouched.
    ///
    /// Completing an already completed task keeps its first end time.
    pub fn set_completed(&mut self, completed: bool, now_ms: i64) {
        match (self.completed, completed) {
            (false, true) => self.actual_end_time = Some(now_ms),
            (_, false) => self.actual_end_time = None,
            (true, true) => {}
        }
        self.completed = completed;
    }

    /// Records one "opened" event and returns the new heat.
    pub fn increase_heat(&mut self) -> u32 {
        self.heat_index = self.heat_index.saturating_add(1);
        self.heat_index
    }

    /// Appends a subtask.
    ///
    /// # Errors
    /// - `ParentMismatch` when the subtask was created for another task.
    /// - `DuplicateSubtask` when a subtask with the same id is attached.
    pub fn add_subtask(&mut self, subtask: Subtask) -> Result<(), ValidationError> {
        if subtask.parent_id() != self.id {
            return Err(ValidationError::ParentMismatch {
                subtask: subtask.id(),
                expected: self.id,
                actual: subtask.parent_id(),
            });
        }
        if self.subtask(subtask.id()).is_some() {
            return Err(ValidationError::DuplicateSubtask(subtask.id()));
        }
        self.subtasks.push(subtask);
        Ok(())
    }

    /// Detaches one subtask, preserving the order of the rest.
    pub fn remove_subtask(&mut self, id: SubtaskId) -> Option<Subtask> {
        let index = self.subtasks.iter().position(|subtask| subtask.id() == id)?;
        Some(self.subtasks.remove(index))
    }
}

impl TryFrom<TaskData> for Task {
    type Error = ValidationError;

    fn try_from(value: TaskData) -> Result<Self, Self::Error> {
        if value.id.0 <= 0 {
            return Err(ValidationError::NonPositiveTaskId(value.id.0));
        }
        if value.title.trim().is_empty() {
            return Err(ValidationError::EmptyTaskTitle);
        }
        check_completion(value.completed, value.actual_end_time)?;

        let mut task = Self {
            id: value.id,
            title: value.title,
            description: value.description,
            completed: value.completed,
            start_time: value.start_time,
            expected_end_time: value.expected_end_time,
            actual_end_time: value.actual_end_time,
            heat_index: value.heat_index,
            tag: value.tag,
            subtasks: Vec::with_capacity(value.subtasks.len()),
        };
        for data in value.subtasks {
            task.add_subtask(Subtask::try_from(data)?)?;
        }
        Ok(task)
    }
}

impl From<Task> for TaskData {
    fn from(value: Task) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            completed: value.completed,
            start_time: value.start_time,
            expected_end_time: value.expected_end_time,
            actual_end_time: value.actual_end_time,
            heat_index: value.heat_index,
            tag: value.tag,
            subtasks: value.subtasks.into_iter().map(SubtaskData::from).collect(),
        }
    }
}
