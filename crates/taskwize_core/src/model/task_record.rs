//! Persisted task record as seen by the proximity core.
//!
//! # Responsibility
//! - Mirror the task store schema fields that location reminders depend on.
//! - Decide whether a task qualifies for proximity monitoring.
//!
//! # See also
//! - `service::restore` for the mapping into `TrackedLocation`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the authenticated account owning tasks.
pub type UserId = String;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Saved location attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub range_meters: f64,
    pub address: Option<String>,
}

/// Durable task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub user_id: UserId,
    pub title: String,
    pub status: TaskStatus,
    pub location: Option<TaskLocation>,
    /// Whether the owner asked to be notified on arrival.
    pub notify_on_location: bool,
}

impl TaskRecord {
    /// Creates a pending task with a generated stable ID.
    pub fn new(user_id: impl Into<UserId>, title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), user_id, title)
    }

    /// Creates a pending task with a caller-provided ID.
    ///
    /// Used when the identity already exists in an external store.
    pub fn with_id(
        id: impl Into<String>,
        user_id: impl Into<UserId>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            status: TaskStatus::Pending,
            location: None,
            notify_on_location: false,
        }
    }

    /// Attaches a location and enables arrival notifications.
    pub fn with_location_reminder(mut self, location: TaskLocation) -> Self {
        self.location = Some(location);
        self.notify_on_location = true;
        self
    }

    /// Returns whether this task should be under proximity monitoring.
    pub fn wants_location_reminder(&self) -> bool {
        self.status == TaskStatus::Pending && self.location.is_some() && self.notify_on_location
    }
}
