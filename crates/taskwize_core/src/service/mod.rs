//! Core use-case services.
//!
//! # Responsibility
//! - Translate between the durable task store and proximity monitoring.
//! - Keep FFI layers decoupled from storage details.

pub mod restore;
