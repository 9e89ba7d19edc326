//! Validation errors raised by entity constructors and mutators.

use super::ids::{SubtaskId, TaskId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected entity input. Callers must not retry with the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTaskTitle,
    EmptySubtaskTitle,
    EmptyTagName,
    InvalidTagColor(String),
    NonPositiveTaskId(i64),
    NonPositiveSubtaskId(i64),
    /// `completed` and `actual_end_time` disagree.
    CompletionMismatch {
        completed: bool,
        actual_end_time: Option<i64>,
    },
    DuplicateSubtask(SubtaskId),
    ParentMismatch {
        subtask: SubtaskId,
        expected: TaskId,
        actual: TaskId,
    },
    /// Every positive task id has been issued.
    TaskIdsExhausted,
    SubtaskIdsExhausted,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTaskTitle => write!(f, "task title cannot be empty"),
            Self::EmptySubtaskTitle => write!(f, "subtask title cannot be empty"),
            Self::EmptyTagName => write!(f, "tag name cannot be empty"),
            Self::InvalidTagColor(color) => {
                write!(f, "tag color `{color}` must match #RRGGBB")
            }
            Self::NonPositiveTaskId(id) => write!(f, "task id must be positive, got {id}"),
            Self::NonPositiveSubtaskId(id) => {
                write!(f, "subtask id must be positive, got {id}")
            }
            Self::CompletionMismatch {
                completed,
                actual_end_time,
            } => write!(
                f,
                "completed ({completed}) disagrees with actual_end_time ({actual_end_time:?})"
            ),
            Self::DuplicateSubtask(id) => write!(f, "subtask {id} is already attached"),
            Self::ParentMismatch {
                subtask,
                expected,
                actual,
            } => write!(
                f,
                "subtask {subtask} belongs to task {actual}, not task {expected}"
            ),
            Self::TaskIdsExhausted => write!(f, "no task ids left to allocate"),
            Self::SubtaskIdsExhausted => write!(f, "no subtask ids left to allocate"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn check_completion(
    completed: bool,
    actual_end_time: Option<i64>,
) -> Result<(), ValidationError> {
    if completed != actual_end_time.is_some() {
        return Err(ValidationError::CompletionMismatch {
            completed,
            actual_end_time,
        });
    }
    Ok(())
}
