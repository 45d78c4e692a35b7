//! Tracked location domain model.
//!
//! # Responsibility
//! - Define the in-memory record monitored for arrival.
//! - Validate geometry before a record may enter the registry.
//!
//! # Invariants
//! - `id` equals the originating task id.
//! - `range_meters` is finite and strictly positive.
//! - Coordinates are finite WGS84 degrees.
//! - Only `pending` records may be tracked; completed ones would never fire
//!   and would keep the registry non-empty.

use crate::geo::distance::GeoPoint;
use crate::model::task_record::TaskStatus;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque identifier of a tracked location, shared with its task record.
pub type LocationId = String;

/// One task location under active proximity monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedLocation {
    pub id: LocationId,
    /// Used verbatim as the notification body.
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Arrival radius in meters.
    pub range_meters: f64,
    /// Fallback notification text when `title` is blank.
    pub address: Option<String>,
    pub status: TaskStatus,
}

impl TrackedLocation {
    /// Creates a pending tracked location without an address.
    pub fn new(
        id: impl Into<LocationId>,
        title: impl Into<String>,
        latitude: f64,
        longitude: f64,
        range_meters: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            latitude,
            longitude,
            range_meters,
            address: None,
            status: TaskStatus::Pending,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Returns whether `position` lies inside the arrival radius.
    ///
    /// The boundary is inclusive: `distance == range_meters` counts as arrived.
    pub fn contains(&self, position: &GeoPoint) -> bool {
        self.point().distance_to(position) <= self.range_meters
    }

    /// Validates fields required for monitoring.
    ///
    /// # Errors
    /// - `EmptyId` when `id` is blank.
    /// - `InvalidCoordinates` when latitude/longitude are not finite or out of range.
    /// - `NonPositiveRange` when `range_meters` is zero, negative or not finite.
    /// - `NotPending` when the task is already completed.
    pub fn validate(&self) -> Result<(), TrackedLocationError> {
        if self.id.trim().is_empty() {
            return Err(TrackedLocationError::EmptyId);
        }
        if !self.is_pending() {
            return Err(TrackedLocationError::NotPending {
                id: self.id.clone(),
            });
        }
        let valid_latitude = self.latitude.is_finite() && self.latitude.abs() <= 90.0;
        let valid_longitude = self.longitude.is_finite() && self.longitude.abs() <= 180.0;
        if !valid_latitude || !valid_longitude {
            return Err(TrackedLocationError::InvalidCoordinates {
                id: self.id.clone(),
            });
        }
        if !(self.range_meters.is_finite() && self.range_meters > 0.0) {
            return Err(TrackedLocationError::NonPositiveRange {
                id: self.id.clone(),
                range_meters: self.range_meters,
            });
        }
        Ok(())
    }

    /// Text shown as notification body.
    ///
    /// Falls back from title to address to a generic message.
    pub fn notification_body(&self) -> String {
        let title = self.title.trim();
        if !title.is_empty() {
            return self.title.clone();
        }
        match self.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => DEFAULT_NOTIFICATION_BODY.to_string(),
        }
    }
}

const DEFAULT_NOTIFICATION_BODY: &str = "A tracked task is nearby";

/// Validation failures for tracked location records.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackedLocationError {
    EmptyId,
    InvalidCoordinates { id: LocationId },
    NonPositiveRange { id: LocationId, range_meters: f64 },
    NotPending { id: LocationId },
}

impl Display for TrackedLocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "tracked location id must not be blank"),
            Self::InvalidCoordinates { id } => {
                write!(f, "tracked location {id} has invalid coordinates")
            }
            Self::NonPositiveRange { id, range_meters } => write!(
                f,
                "tracked location {id} range must be positive, got {range_meters}"
            ),
            Self::NotPending { id } => {
                write!(f, "tracked location {id} belongs to a completed task")
            }
        }
    }
}

impl Error for TrackedLocationError {}
