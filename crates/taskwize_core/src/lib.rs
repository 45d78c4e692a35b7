//! Core domain logic for TaskWize location reminders.
//! This crate owns the proximity monitoring invariants; hosts plug in
//! platform collaborators through `platform` traits.

pub mod config;
pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod platform;
pub mod proximity;
pub mod repo;
pub mod service;

pub use config::{ConfigError, MonitorConfig};
pub use geo::distance::{distance_meters, GeoPoint, EARTH_RADIUS_METERS};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task_record::{TaskLocation, TaskRecord, TaskStatus, UserId};
pub use model::tracked_location::{LocationId, TrackedLocation, TrackedLocationError};
pub use platform::{
    AuthProvider, FeedOptions, LocationProvider, NotificationDispatcher, NotificationId,
    PermissionStatus, PlatformError, PlatformResult, PositionCallback, SoundPlayer,
    SubscriptionHandle,
};
pub use proximity::error::{MonitorError, MonitorResult, PermissionKind};
pub use proximity::evaluator::{EvaluationReport, ProximityEvaluator};
pub use proximity::monitor::{LocationMonitor, MonitorCollaborators, MonitorState};
pub use proximity::registry::{RegistryEvent, TrackedLocationRegistry};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskStore};
pub use service::restore::{collect_tracked_locations, tracked_location_from_task};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
