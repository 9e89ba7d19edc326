//! Filter + stable sort over task snapshots.

use crate::model::task::Task;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Completion filter applied before sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    #[default]
    All,
    Complete,
    Incomplete,
}

/// Sort key and direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Start time, oldest first.
    #[default]
    Creation,
    /// Start time, newest first.
    CreationReversed,
    /// Deadline, earliest first.
    Due,
    /// Deadline, latest first.
    DueReversed,
    /// Heat index, hottest first.
    Heat,
    /// Completion time, earliest first. Forces the `Complete` filter.
    Completion,
    /// Completion time, latest first. Forces the `Complete` filter.
    CompletionReversed,
}

const QUERY_MODES: &[QueryMode] = &[QueryMode::All, QueryMode::Complete, QueryMode::Incomplete];

const SORT_MODES: &[SortMode] = &[
    SortMode::Creation,
    SortMode::CreationReversed,
    SortMode::Due,
    SortMode::DueReversed,
    SortMode::Heat,
    SortMode::Completion,
    SortMode::CompletionReversed,
];

impl QueryMode {
    /// Stable string id used by shells and settings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
        }
    }

    pub fn all() -> &'static [QueryMode] {
        QUERY_MODES
    }

    fn accepts(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Complete => task.is_completed(),
            Self::Incomplete => !task.is_completed(),
        }
    }
}

impl SortMode {
    /// Stable string id used by shells and settings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::CreationReversed => "creation_r",
            Self::Due => "due",
            Self::DueReversed => "due_r",
            Self::Heat => "heat",
            Self::Completion => "complete",
            Self::CompletionReversed => "complete_r",
        }
    }

    pub fn all() -> &'static [SortMode] {
        SORT_MODES
    }

    fn compare(self, left: &Task, right: &Task) -> Ordering {
        match self {
            Self::Creation => left.start_time().cmp(&right.start_time()),
            Self::CreationReversed => right.start_time().cmp(&left.start_time()),
            Self::Due => left.expected_end_time().cmp(&right.expected_end_time()),
            Self::DueReversed => right.expected_end_time().cmp(&left.expected_end_time()),
            Self::Heat => right.heat_index().cmp(&left.heat_index()),
            Self::Completion => left.actual_end_time().cmp(&right.actual_end_time()),
            Self::CompletionReversed => right.actual_end_time().cmp(&left.actual_end_time()),
        }
    }
}

/// Unknown mode string passed to `FromStr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError {
    kind: &'static str,
    value: String,
}

impl Display for ParseModeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported {} mode `{}`", self.kind, self.value)
    }
}

impl Error for ParseModeError {}

impl FromStr for QueryMode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        QUERY_MODES
            .iter()
            .copied()
            .find(|mode| mode.as_str() == normalized)
            .ok_or(ParseModeError {
                kind: "query",
                value: value.to_string(),
            })
    }
}

impl FromStr for SortMode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        SORT_MODES
            .iter()
            .copied()
            .find(|mode| mode.as_str() == normalized)
            .ok_or(ParseModeError {
                kind: "sort",
                value: value.to_string(),
            })
    }
}

impl Display for QueryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for SortMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the filter actually applied for a `(query, sort)` pair.
///
/// Incomplete tasks have no completion time, so completion sorts only ever
/// see completed tasks.
pub fn effective_query_mode(query: QueryMode, sort: SortMode) -> QueryMode {
    match sort {
        SortMode::Completion | SortMode::CompletionReversed => QueryMode::Complete,
        _ => query,
    }
}

/// Returns a filtered, stably sorted copy of `tasks`.
pub fn query_tasks(tasks: &[Task], query: QueryMode, sort: SortMode) -> Vec<Task> {
    let filter = effective_query_mode(query, sort);
    let mut selected: Vec<Task> = tasks
        .iter()
        .filter(|task| filter.accepts(task))
        .cloned()
        .collect();
    // `sort_by` is a stable merge sort.
    selected.sort_by(|left, right| sort.compare(left, right));
    selected
}
