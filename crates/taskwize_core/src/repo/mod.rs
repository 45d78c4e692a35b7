//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the task store contract consumed by proximity restore.
//! - Isolate SQLite query details from monitoring logic.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to DB transport errors.

pub mod task_repo;
