//! Domain model for tasks and proximity monitoring.
//!
//! # Responsibility
//! - Define task records read from the durable store.
//! - Define the tracked location record held by the in-memory registry.
//!
//! # Invariants
//! - A tracked location shares its id with the task it was derived from.

pub mod task_record;
pub mod tracked_location;
