//! Task domain model.
//!
//! # Responsibility
//! - Define the task/subtask/tag entities the store owns.
//! - Provide the id allocator and clock that entity construction draws from.
//!
//! # Invariants
//! - Entities are only built through validating constructors or `TryFrom`
//!   conversions from their plain `*Data` shapes.
//! - A task exclusively owns its subtasks; subtasks refer back by id only.

pub mod clock;
pub mod ids;
pub mod subtask;
pub mod tag;
pub mod task;
pub mod validation;
