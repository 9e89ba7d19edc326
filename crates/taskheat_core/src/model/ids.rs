//! Task/subtask identifiers and the allocator that hands them out.
//!
//! # Responsibility
//! - Give tasks and subtasks stable integer identities in two separate spaces.
//! - Allocate ids monotonically and never hand out the same id twice.
//!
//! # Invariants
//! - Allocated ids are strictly increasing within each id space.
//! - `observe` only ever raises watermarks, so ids that already exist (or
//!   existed before a restart) are never reissued.
//! - An id at or below the watermark can join the collection only once, and
//!   only if this allocator handed it out.
//! - Exhausting an id space is an error, never a wrap-around.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::task::Task;
use super::validation::ValidationError;

/// Identity of a task. Allocated ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

/// Identity of a subtask. Independent from `TaskId` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(pub i64);

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SubtaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Highest ids handed out so far, persisted next to the task collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdWatermarks {
    pub last_task_id: i64,
    pub last_subtask_id: i64,
}

impl IdWatermarks {
    /// Returns the component-wise maximum of two watermark sets.
    pub fn max(self, other: Self) -> Self {
        Self {
            last_task_id: self.last_task_id.max(other.last_task_id),
            last_subtask_id: self.last_subtask_id.max(other.last_subtask_id),
        }
    }

    /// Computes the watermarks implied by the ids present in `tasks`.
    pub fn covering(tasks: &[Task]) -> Self {
        let mut marks = Self::default();
        for task in tasks {
            marks.last_task_id = marks.last_task_id.max(task.id().0);
            for subtask in task.subtasks() {
                marks.last_subtask_id = marks.last_subtask_id.max(subtask.id().0);
            }
        }
        marks
    }
}

/// Thread-safe id source for tasks and subtasks.
///
/// Injected into the store instead of living in process-wide statics, so
/// tests can start from known values.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last_task: AtomicI64,
    last_subtask: AtomicI64,
    // Handed out but not yet part of the collection.
    pending_tasks: Mutex<BTreeSet<i64>>,
    pending_subtasks: Mutex<BTreeSet<i64>>,
}

impl IdAllocator {
    /// Creates an allocator whose first ids will be `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that continues after the given watermarks.
    pub fn from_watermarks(marks: IdWatermarks) -> Self {
        Self {
            last_task: AtomicI64::new(marks.last_task_id.max(0)),
            last_subtask: AtomicI64::new(marks.last_subtask_id.max(0)),
            ..Self::default()
        }
    }

    /// # Errors
    /// - `TaskIdsExhausted` once `i64::MAX` has been issued or observed.
    pub fn next_task_id(&self) -> Result<TaskId, ValidationError> {
        allocate(&self.last_task, &self.pending_tasks)
            .map(TaskId)
            .ok_or(ValidationError::TaskIdsExhausted)
    }

    /// # Errors
    /// - `SubtaskIdsExhausted` once `i64::MAX` has been issued or observed.
    pub fn next_subtask_id(&self) -> Result<SubtaskId, ValidationError> {
        allocate(&self.last_subtask, &self.pending_subtasks)
            .map(SubtaskId)
            .ok_or(ValidationError::SubtaskIdsExhausted)
    }

    /// Whether a task with `id` may join the collection: either it was handed
    /// out by `next_task_id` and not observed since, or it lies above every
    /// id seen so far.
    pub fn can_claim_task(&self, id: TaskId) -> bool {
        can_claim(&self.last_task, &self.pending_tasks, id.0)
    }

    /// Subtask counterpart of `can_claim_task`.
    pub fn can_claim_subtask(&self, id: SubtaskId) -> bool {
        can_claim(&self.last_subtask, &self.pending_subtasks, id.0)
    }

    /// Marks every id carried by `task` and its subtasks as used.
    pub fn observe(&self, task: &Task) {
        self.last_task.fetch_max(task.id().0, Ordering::SeqCst);
        lock(&self.pending_tasks).remove(&task.id().0);
        for subtask in task.subtasks() {
            self.observe_subtask(subtask.id());
        }
    }

    /// Marks subtask `id` as used.
    pub fn observe_subtask(&self, id: SubtaskId) {
        self.last_subtask.fetch_max(id.0, Ordering::SeqCst);
        lock(&self.pending_subtasks).remove(&id.0);
    }

    /// Returns the current high-water marks.
    pub fn watermarks(&self) -> IdWatermarks {
        IdWatermarks {
            last_task_id: self.last_task.load(Ordering::SeqCst),
            last_subtask_id: self.last_subtask.load(Ordering::SeqCst),
        }
    }
}

fn allocate(last: &AtomicI64, pending: &Mutex<BTreeSet<i64>>) -> Option<i64> {
    let previous = last
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            current.checked_add(1)
        })
        .ok()?;
    let id = previous + 1;
    lock(pending).insert(id);
    Some(id)
}

fn can_claim(last: &AtomicI64, pending: &Mutex<BTreeSet<i64>>, id: i64) -> bool {
    id > last.load(Ordering::SeqCst) || lock(pending).contains(&id)
}

fn lock(pending: &Mutex<BTreeSet<i64>>) -> MutexGuard<'_, BTreeSet<i64>> {
    pending
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{IdAllocator, IdWatermarks, SubtaskId, TaskId};
    use crate::model::task::Task;
    use crate::model::validation::ValidationError;

    #[test]
    fn allocator_spaces_are_independent() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_task_id(), Ok(TaskId(1)));
        assert_eq!(ids.next_task_id(), Ok(TaskId(2)));
        assert_eq!(ids.next_subtask_id(), Ok(SubtaskId(1)));
        assert_eq!(ids.next_task_id(), Ok(TaskId(3)));
    }

    #[test]
    fn allocator_resumes_after_watermarks() {
        let ids = IdAllocator::from_watermarks(IdWatermarks {
            last_task_id: 41,
            last_subtask_id: 7,
        });
        assert_eq!(ids.next_task_id(), Ok(TaskId(42)));
        assert_eq!(ids.next_subtask_id(), Ok(SubtaskId(8)));
        assert_eq!(
            ids.watermarks(),
            IdWatermarks {
                last_task_id: 42,
                last_subtask_id: 8,
            }
        );
    }

    #[test]
    fn concurrent_allocation_never_repeats() {
        let ids = std::sync::Arc::new(IdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = std::sync::Arc::clone(&ids);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| ids.next_task_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 1000);
        assert_eq!(all.last(), Some(&TaskId(1000)));
    }

    #[test]
    fn handed_out_ids_are_claimable_once() {
        let ids = IdAllocator::new();
        let id = ids.next_task_id().unwrap();
        assert!(ids.can_claim_task(id));

        ids.observe(&Task::new(id, "claimed", 0, 0).unwrap());

        assert!(!ids.can_claim_task(id));
        assert!(ids.can_claim_task(TaskId(id.0 + 1)));
    }

    #[test]
    fn ids_below_the_watermark_are_not_claimable_unless_handed_out() {
        let ids = IdAllocator::from_watermarks(IdWatermarks {
            last_task_id: 10,
            last_subtask_id: 4,
        });
        assert!(!ids.can_claim_task(TaskId(3)));
        assert!(!ids.can_claim_subtask(SubtaskId(4)));
        assert!(ids.can_claim_subtask(SubtaskId(5)));

        let issued = ids.next_subtask_id().unwrap();
        ids.observe_subtask(SubtaskId(9));
        assert!(ids.can_claim_subtask(issued));
        ids.observe_subtask(issued);
        assert!(!ids.can_claim_subtask(issued));
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        let ids = IdAllocator::from_watermarks(IdWatermarks {
            last_task_id: i64::MAX,
            last_subtask_id: i64::MAX - 1,
        });
        assert_eq!(ids.next_task_id(), Err(ValidationError::TaskIdsExhausted));
        assert_eq!(ids.next_subtask_id(), Ok(SubtaskId(i64::MAX)));
        assert_eq!(
            ids.next_subtask_id(),
            Err(ValidationError::SubtaskIdsExhausted)
        );
        assert_eq!(ids.watermarks().last_task_id, i64::MAX);
    }
}
