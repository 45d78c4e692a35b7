//! Geographic primitives used by proximity monitoring.
//!
//! # Responsibility
//! - Represent device and task coordinates.
//! - Compute great-circle distances between coordinates.
//!
//! # Invariants
//! - Coordinates are WGS84 degrees; distances are meters.

pub mod distance;
