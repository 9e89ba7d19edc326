//! Task store façade.
//!
//! # Responsibility
//! - Own the root task collection and be the only code that mutates it.
//! - Validate mutations, track heat, and hand snapshots to the autosave worker.
//! - Serve filtered/sorted copies of the collection to shells.
//!
//! # Invariants
//! - Task ids and subtask ids are unique across the whole collection.
//! - An id that has been in the collection is never accepted again, even
//!   after the task or subtask carrying it was removed.
//! - The live collection is never shared; the worker only receives owned
//!   snapshots taken at the moment a mutation completes.
//! - Save failures after a mutation are logged and recorded, never returned.
//! - Loading corrupt data fails construction instead of starting empty.

use crate::config::StoreConfig;
use crate::model::clock::{Clock, SystemClock};
use crate::model::ids::{IdAllocator, IdWatermarks, SubtaskId, TaskId};
use crate::model::subtask::Subtask;
use crate::model::tag::Tag;
use crate::model::task::Task;
use crate::model::validation::ValidationError;
use crate::query::{query_tasks, QueryMode, SortMode};
use crate::repo::snapshot_repo::{
    PersistenceError, SqliteFilePersistence, TaskPersistence, TaskSnapshot,
};
use crate::service::autosave::{AutosaveError, AutosaveStatus, AutosaveWorker};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::Arc;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error for mutation, query and persistence entry points.
#[derive(Debug)]
pub enum StoreError {
    Validation(ValidationError),
    TaskNotFound(TaskId),
    SubtaskNotFound(SubtaskId),
    DuplicateTask(TaskId),
    /// Id is not currently present but was used before, or lies at or below
    /// the watermark without having been handed out by this store.
    RetiredTaskId(TaskId),
    RetiredSubtaskId(SubtaskId),
    Persistence(PersistenceError),
    AutosaveStopped,
    WorkerSpawn(io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::SubtaskNotFound(id) => write!(f, "subtask not found: {id}"),
            Self::DuplicateTask(id) => write!(f, "task {id} is already in the store"),
            Self::RetiredTaskId(id) => {
                write!(f, "task id {id} was not issued by this store or was already used")
            }
            Self::RetiredSubtaskId(id) => write!(
                f,
                "subtask id {id} was not issued by this store or was already used"
            ),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::AutosaveStopped => write!(f, "autosave worker is not running"),
            Self::WorkerSpawn(err) => write!(f, "failed to start autosave worker: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::WorkerSpawn(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PersistenceError> for StoreError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<AutosaveError> for StoreError {
    fn from(value: AutosaveError) -> Self {
        match value {
            AutosaveError::Stopped => Self::AutosaveStopped,
            AutosaveError::Persistence(err) => Self::Persistence(err),
        }
    }
}

/// Partial update for `TaskStore::edit_task`. `None` leaves a field as is.
///
/// Titles are immutable and deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub expected_end_time: Option<i64>,
    /// `Some(None)` removes the tag.
    pub tag: Option<Option<Tag>>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.expected_end_time.is_none() && self.tag.is_none()
    }
}

/// Single owner of the task collection for one process.
pub struct TaskStore {
    tasks: Vec<Task>,
    config: StoreConfig,
    ids: IdAllocator,
    clock: Arc<dyn Clock>,
    autosave: AutosaveWorker,
}

impl TaskStore {
    /// Opens the store at `config.task_save_path` using the system clock.
    ///
    /// # Errors
    /// - `StoreError::Persistence` when an existing snapshot cannot be read.
    /// - `StoreError::WorkerSpawn` when the autosave thread cannot start.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let persistence = SqliteFilePersistence::new(config.task_save_path.clone());
        Self::open_with(config, persistence, Arc::new(SystemClock))
    }

    /// Opens the store with injected persistence and clock.
    ///
    /// The collection is loaded synchronously; `persistence` then moves to the
    /// autosave worker, which is its only user afterwards.
    pub fn open_with<P>(
        config: StoreConfig,
        persistence: P,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self>
    where
        P: TaskPersistence + Send + 'static,
    {
        let snapshot = persistence.load()?;
        let marks = snapshot
            .watermarks
            .max(IdWatermarks::covering(&snapshot.tasks));
        let autosave = AutosaveWorker::spawn(persistence, config.autosave_queue_capacity)
            .map_err(StoreError::WorkerSpawn)?;

        info!(
            "event=store_open module=store status=ok tasks={} auto_save={} last_task_id={} last_subtask_id={}",
            snapshot.tasks.len(),
            config.auto_save,
            marks.last_task_id,
            marks.last_subtask_id
        );

        Ok(Self {
            tasks: snapshot.tasks,
            config,
            ids: IdAllocator::from_watermarks(marks),
            clock,
            autosave,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Turns per-mutation persistence on or off. Manual saves keep working.
    pub fn set_auto_save(&mut self, enabled: bool) {
        self.config.auto_save = enabled;
    }

    /// Builds a task with the next task id, started now.
    ///
    /// The task is not part of the store until passed to `add_task`.
    ///
    /// # Errors
    /// - `TaskIdsExhausted` when no id is left; otherwise title validation.
    pub fn new_task(
        &self,
        title: impl Into<String>,
        expected_end_time: i64,
    ) -> Result<Task, ValidationError> {
        Task::new(
            self.ids.next_task_id()?,
            title,
            expected_end_time,
            self.clock.now_ms(),
        )
    }

    /// Builds a subtask for `parent` with the next subtask id, started now.
    pub fn new_subtask(
        &self,
        parent: TaskId,
        title: impl Into<String>,
    ) -> Result<Subtask, ValidationError> {
        Subtask::new(self.ids.next_subtask_id()?, parent, title, self.clock.now_ms())
    }

    /// Appends `task` to the collection.
    ///
    /// # Errors
    /// - `DuplicateTask` when a task with the same id is present.
    /// - `Validation(DuplicateSubtask)` when one of its subtask ids is in use.
    /// - `RetiredTaskId` / `RetiredSubtaskId` for ids that were used before or
    ///   were never handed out by `new_task` / `new_subtask`.
    pub fn add_task(&mut self, task: Task) -> StoreResult<TaskId> {
        if self.get_task_by_id(task.id()).is_some() {
            return Err(StoreError::DuplicateTask(task.id()));
        }
        if let Some(taken) = task
            .subtasks()
            .iter()
            .find(|subtask| self.find_subtask(subtask.id()).is_some())
        {
            return Err(ValidationError::DuplicateSubtask(taken.id()).into());
        }
        if !self.ids.can_claim_task(task.id()) {
            return Err(StoreError::RetiredTaskId(task.id()));
        }
        if let Some(retired) = task
            .subtasks()
            .iter()
            .find(|subtask| !self.ids.can_claim_subtask(subtask.id()))
        {
            return Err(StoreError::RetiredSubtaskId(retired.id()));
        }

        let id = task.id();
        self.ids.observe(&task);
        self.tasks.push(task);
        self.trigger_autosave("add_task");
        Ok(id)
    }

    /// Removes the task with `id`. Absent ids are a no-op.
    pub fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id() == id)?;
        let removed = self.tasks.remove(index);
        self.trigger_autosave("remove_task");
        Some(removed)
    }

    /// Sets completion and the matching `actual_end_time`.
    pub fn set_task_completed(&mut self, id: TaskId, completed: bool) -> StoreResult<()> {
        let now = self.clock.now_ms();
        self.task_mut(id)?.set_completed(completed, now);
        self.trigger_autosave("set_task_completed");
        Ok(())
    }

    /// Sets completion of one subtask. The parent task is not affected.
    pub fn set_subtask_completed(&mut self, id: SubtaskId, completed: bool) -> StoreResult<()> {
        let now = self.clock.now_ms();
        self.subtask_mut(id)?.set_completed(completed, now);
        self.trigger_autosave("set_subtask_completed");
        Ok(())
    }

    /// Records that a task was opened/inspected. Returns the new heat.
    pub fn update_heat(&mut self, id: TaskId) -> StoreResult<u32> {
        let heat = self.task_mut(id)?.increase_heat();
        self.trigger_autosave("update_heat");
        Ok(heat)
    }

    /// Applies description/deadline/tag changes to one task.
    pub fn edit_task(&mut self, id: TaskId, edit: TaskEdit) -> StoreResult<()> {
        let task = self.task_mut(id)?;
        if let Some(description) = edit.description {
            task.set_description(description);
        }
        if let Some(expected_end_time) = edit.expected_end_time {
            task.set_expected_end_time(expected_end_time);
        }
        if let Some(tag) = edit.tag {
            task.set_tag(tag);
        }
        self.trigger_autosave("edit_task");
        Ok(())
    }

    /// Attaches `subtask` to the end of task `task_id`'s subtask list.
    pub fn add_subtask(&mut self, task_id: TaskId, subtask: Subtask) -> StoreResult<SubtaskId> {
        if self.find_subtask(subtask.id()).is_some() {
            return Err(ValidationError::DuplicateSubtask(subtask.id()).into());
        }
        if !self.ids.can_claim_subtask(subtask.id()) {
            return Err(StoreError::RetiredSubtaskId(subtask.id()));
        }
        let id = subtask.id();
        self.task_mut(task_id)?.add_subtask(subtask)?;
        self.ids.observe_subtask(id);
        self.trigger_autosave("add_subtask");
        Ok(id)
    }

    /// Detaches one subtask from whichever task owns it.
    pub fn remove_subtask(&mut self, id: SubtaskId) -> Option<Subtask> {
        let removed = self
            .tasks
            .iter_mut()
            .find_map(|task| task.remove_subtask(id))?;
        self.trigger_autosave("remove_subtask");
        Some(removed)
    }

    pub fn set_subtask_description(
        &mut self,
        id: SubtaskId,
        description: Option<String>,
    ) -> StoreResult<()> {
        self.subtask_mut(id)?.set_description(description);
        self.trigger_autosave("set_subtask_description");
        Ok(())
    }

    pub fn get_task_by_id(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    pub fn find_subtask(&self, id: SubtaskId) -> Option<&Subtask> {
        self.tasks.iter().find_map(|task| task.subtask(id))
    }

    /// Returns a filtered, sorted copy of the collection.
    pub fn get_tasks(&self, query: QueryMode, sort: SortMode) -> Vec<Task> {
        query_tasks(&self.tasks, query, sort)
    }

    /// All tasks in creation order.
    pub fn all_tasks(&self) -> Vec<Task> {
        self.get_tasks(QueryMode::All, SortMode::Creation)
    }

    /// Incomplete tasks whose deadline has passed, earliest deadline first.
    pub fn overdue_tasks(&self) -> Vec<Task> {
        let now = self.clock.now_ms();
        let mut overdue = self.get_tasks(QueryMode::Incomplete, SortMode::Due);
        overdue.retain(|task| task.is_overdue(now));
        overdue
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Owned copy of the collection plus id watermarks.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            tasks: self.tasks.clone(),
            watermarks: self.ids.watermarks(),
        }
    }

    /// Persists the current state and waits for the result.
    ///
    /// Runs on the autosave worker behind any pending autosaves, so an older
    /// queued snapshot can never overwrite this one.
    pub fn save_now(&self) -> StoreResult<()> {
        self.autosave.save_and_wait(self.snapshot())?;
        Ok(())
    }

    /// Blocks until every queued autosave has been applied.
    pub fn flush(&self) -> StoreResult<()> {
        self.autosave.flush()?;
        Ok(())
    }

    pub fn autosave_status(&self) -> AutosaveStatus {
        self.autosave.status()
    }

    /// Drains pending autosaves and stops the worker.
    ///
    /// Dropping the store does the same; `close` only makes the point explicit.
    pub fn close(mut self) {
        self.autosave.shutdown();
        info!("event=store_close module=store status=ok tasks={}", self.tasks.len());
    }

    fn trigger_autosave(&self, op: &'static str) {
        if !self.config.auto_save {
            debug!("event=autosave_skip module=store op={op} reason=disabled");
            return;
        }
        match self.autosave.enqueue(self.snapshot()) {
            Ok(()) => debug!("event=autosave_enqueue module=store status=ok op={op}"),
            Err(err) => {
                error!("event=autosave_enqueue module=store status=error op={op} error={err}")
            }
        }
    }

    fn task_mut(&mut self, id: TaskId) -> StoreResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|task| task.id() == id)
            .ok_or(StoreError::TaskNotFound(id))
    }

    fn subtask_mut(&mut self, id: SubtaskId) -> StoreResult<&mut Subtask> {
        self.tasks
            .iter_mut()
            .find_map(|task| task.subtask_mut(id))
            .ok_or(StoreError::SubtaskNotFound(id))
    }
}
