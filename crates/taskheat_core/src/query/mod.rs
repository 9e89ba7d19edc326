//! Task filtering and ordering.
//!
//! # Responsibility
//! - Filter a task slice by completion state.
//! - Order the filtered copy by one of the supported sort keys.
//!
//! # Invariants
//! - Queries never mutate their input; results are owned copies.
//! - Sorting is stable: equal keys keep their filtered relative order.
//! - Sorting by completion time forces the `Complete` filter.

pub mod engine;

pub use engine::{effective_query_mode, query_tasks, ParseModeError, QueryMode, SortMode};
