//! Host platform collaborator contracts.
//!
//! # Responsibility
//! - Describe what the proximity core needs from the host: session state,
//!   positioning, notification delivery and sound playback.
//! - Keep the core free of any mobile SDK dependency.
//!
//! # Invariants
//! - Implementations must be `Send + Sync`; the monitor shares them via `Arc`.
//! - Implementations must not call back into `LocationMonitor` from
//!   `notify`/`play_effect`; those run while the monitor state is locked.

use crate::geo::distance::GeoPoint;
use crate::model::task_record::UserId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for platform collaborator calls.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Identifier returned by the notification dispatcher.
pub type NotificationId = String;

/// Callback receiving position updates from a location feed.
pub type PositionCallback = Box<dyn Fn(GeoPoint) + Send + Sync>;

/// Failure reported by a host collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    /// Stable machine-readable code, e.g. `location_unavailable`.
    pub code: String,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error for PlatformError {}

/// Outcome of a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Options for a recurring location feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedOptions {
    /// Desired interval between updates.
    pub interval_ms: u64,
    /// Minimum movement before the platform emits a new update.
    pub min_distance_meters: f64,
}

/// Opaque handle of one active location feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Session source; the guard for every lifecycle transition.
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Device positioning service.
pub trait LocationProvider: Send + Sync {
    /// Whether the platform can deliver updates while the app is backgrounded.
    fn supports_background_updates(&self) -> bool;
    fn request_foreground_permission(&self) -> PlatformResult<PermissionStatus>;
    fn request_background_permission(&self) -> PlatformResult<PermissionStatus>;
    fn current_position(&self) -> PlatformResult<GeoPoint>;
    /// Starts a feed. Implementations may invoke `callback` before returning.
    fn subscribe(
        &self,
        options: FeedOptions,
        callback: PositionCallback,
    ) -> PlatformResult<SubscriptionHandle>;
    fn unsubscribe(&self, handle: SubscriptionHandle) -> PlatformResult<()>;
}

/// Best-effort local notification delivery.
pub trait NotificationDispatcher: Send + Sync {
    /// Returns `None` when the host suppressed the notification (for example
    /// because the user disabled notifications).
    fn notify(&self, title: &str, body: &str) -> PlatformResult<Option<NotificationId>>;
}

/// Local sound effect playback.
pub trait SoundPlayer: Send + Sync {
    /// User sound preference; owned by the host, read by the core.
    fn is_enabled(&self) -> bool;
    fn play_effect(&self) -> PlatformResult<()>;
}
