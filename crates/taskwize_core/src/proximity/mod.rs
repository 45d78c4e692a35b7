//! Location proximity monitoring.
//!
//! # Responsibility
//! - Track task locations with reminders enabled.
//! - Detect arrivals from device positions and notify exactly once.
//! - Drive the location feed lifecycle from session, permission and registry state.
//!
//! # Invariants
//! - Failures are logged and returned as values; nothing here panics.
//! - Registry state is owned by a monitor instance, never a process global.

pub mod error;
pub mod evaluator;
pub mod monitor;
pub mod registry;
