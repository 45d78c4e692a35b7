//! Arrival detection over the tracked location registry.
//!
//! # Responsibility
//! - Compare one position against every pending tracked location.
//! - Dispatch the arrival notification (and optional sound) per arrival.
//! - Remove fired records so one arrival notifies at most once.
//!
//! # Invariants
//! - Iteration runs over a snapshot; removals never skip or repeat records.
//! - A dispatch failure for one record never aborts the remaining records.
//! - Fired records are removed even when dispatch failed.

use crate::geo::distance::GeoPoint;
use crate::model::tracked_location::{LocationId, TrackedLocation};
use crate::platform::{NotificationDispatcher, PlatformError, SoundPlayer};
use crate::proximity::registry::{RegistryEvent, TrackedLocationRegistry};
use log::{debug, info, warn};
use std::sync::Arc;

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// Number of pending records compared against the position.
    pub checked: usize,
    /// Records found in range and removed, in evaluation order.
    pub arrived: Vec<LocationId>,
    /// Subset of `arrived` whose notification could not be dispatched.
    pub failed: Vec<(LocationId, PlatformError)>,
    /// Registry transitions caused by the removals.
    pub events: Vec<RegistryEvent>,
}

impl EvaluationReport {
    pub fn became_empty(&self) -> bool {
        self.events.contains(&RegistryEvent::BecameEmpty)
    }
}

/// Evaluates positions and fires arrival notifications.
pub struct ProximityEvaluator {
    notifier: Arc<dyn NotificationDispatcher>,
    sound: Arc<dyn SoundPlayer>,
    notification_title: String,
}

impl ProximityEvaluator {
    pub fn new(
        notifier: Arc<dyn NotificationDispatcher>,
        sound: Arc<dyn SoundPlayer>,
        notification_title: impl Into<String>,
    ) -> Self {
        Self {
            notifier,
            sound,
            notification_title: notification_title.into(),
        }
    }

    /// Runs one pass for `position` against `registry`.
    ///
    /// # Side effects
    /// - Plays the sound effect when the user preference allows it.
    /// - Dispatches one notification per arrival.
    /// - Removes every arrived record from `registry`.
    pub fn evaluate(
        &self,
        registry: &mut TrackedLocationRegistry,
        position: GeoPoint,
    ) -> EvaluationReport {
        let mut report = EvaluationReport::default();
        if !position.is_finite() {
            warn!("event=proximity_evaluate module=proximity status=skipped reason=non_finite_position");
            return report;
        }

        for record in registry.list() {
            if !record.is_pending() {
                debug!(
                    "event=proximity_evaluate module=proximity status=skipped location_id={} reason=not_pending",
                    record.id
                );
                continue;
            }
            report.checked += 1;
            if !record.contains(&position) {
                continue;
            }

            if let Err(err) = self.fire(&record) {
                report.failed.push((record.id.clone(), err));
            }
            if let Some(event) = registry.remove(&record.id) {
                report.events.push(event);
            }
            report.arrived.push(record.id);
        }

        if !report.arrived.is_empty() {
            info!(
                "event=proximity_evaluate module=proximity status=ok checked={} arrived={} failed={} remaining={}",
                report.checked,
                report.arrived.len(),
                report.failed.len(),
                registry.len()
            );
        }
        report
    }

    fn fire(&self, record: &TrackedLocation) -> Result<(), PlatformError> {
        if self.sound.is_enabled() {
            if let Err(err) = self.sound.play_effect() {
                warn!(
                    "event=arrival_sound module=proximity status=error location_id={} error_code={}",
                    record.id, err.code
                );
            }
        }

        match self
            .notifier
            .notify(&self.notification_title, &record.notification_body())
        {
            Ok(notification_id) => {
                info!(
                    "event=arrival_notify module=proximity status=ok location_id={} delivered={}",
                    record.id,
                    notification_id.is_some()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=arrival_notify module=proximity status=error location_id={} error_code={} error={}",
                    record.id, err.code, err.message
                );
                Err(err)
            }
        }
    }
}
