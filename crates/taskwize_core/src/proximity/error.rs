//! Proximity monitoring error taxonomy.
//!
//! Every variant is non-fatal: callers log it and continue with proximity
//! reminders unavailable or unchanged.

use crate::model::tracked_location::TrackedLocationError;
use crate::platform::PlatformError;
use crate::repo::task_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MonitorResult<T> = Result<T, MonitorError>;

/// Which location permission prompt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    Foreground,
    Background,
}

impl PermissionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

/// Errors from lifecycle and registry operations of `LocationMonitor`.
#[derive(Debug)]
pub enum MonitorError {
    /// No active user session.
    NotAuthenticated,
    /// A location permission was refused.
    PermissionDenied(PermissionKind),
    /// The platform cannot deliver background location updates.
    BackgroundUnsupported,
    /// `start` was called before a successful `initialize`.
    NotInitialized,
    /// `start` was called with an empty registry.
    NothingToTrack,
    /// A record failed validation and was not tracked.
    InvalidLocation(TrackedLocationError),
    /// Restore could not read the task store.
    StoreQueryFailure(RepoError),
    /// The platform location feed could not be started.
    FeedSubscriptionFailure(PlatformError),
    /// Any other collaborator failure (permission prompt, position query).
    Platform(PlatformError),
}

impl MonitorError {
    /// Stable code used in log events and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::PermissionDenied(_) => "permission_denied",
            Self::BackgroundUnsupported => "background_unsupported",
            Self::NotInitialized => "not_initialized",
            Self::NothingToTrack => "nothing_to_track",
            Self::InvalidLocation(_) => "invalid_location",
            Self::StoreQueryFailure(_) => "store_query_failed",
            Self::FeedSubscriptionFailure(_) => "feed_subscription_failed",
            Self::Platform(_) => "platform_error",
        }
    }
}

impl Display for MonitorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "no authenticated user session"),
            Self::PermissionDenied(kind) => {
                write!(f, "{} location permission denied", kind.as_str())
            }
            Self::BackgroundUnsupported => {
                write!(f, "platform does not support background location updates")
            }
            Self::NotInitialized => write!(f, "location monitor is not initialized"),
            Self::NothingToTrack => write!(f, "no tracked locations to monitor"),
            Self::InvalidLocation(err) => write!(f, "{err}"),
            Self::StoreQueryFailure(err) => write!(f, "task store query failed: {err}"),
            Self::FeedSubscriptionFailure(err) => {
                write!(f, "location feed subscription failed: {err}")
            }
            Self::Platform(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MonitorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLocation(err) => Some(err),
            Self::StoreQueryFailure(err) => Some(err),
            Self::FeedSubscriptionFailure(err) => Some(err),
            Self::Platform(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TrackedLocationError> for MonitorError {
    fn from(value: TrackedLocationError) -> Self {
        Self::InvalidLocation(value)
    }
}

impl From<PlatformError> for MonitorError {
    fn from(value: PlatformError) -> Self {
        Self::Platform(value)
    }
}
