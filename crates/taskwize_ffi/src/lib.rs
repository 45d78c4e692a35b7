//! Flutter-facing bindings for the TaskWize proximity core.

pub mod api;
