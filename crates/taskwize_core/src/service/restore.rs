//! Restore-on-login adapter between the task store and the proximity registry.
//!
//! # Responsibility
//! - Select tasks that qualify for arrival reminders.
//! - Translate store records into `TrackedLocation` values.
//!
//! # Invariants
//! - Only `pending` tasks with a location and `notify_on_location` qualify,
//!   whatever the store returned.
//! - Records failing validation are skipped, never tracked.

use crate::model::task_record::TaskRecord;
use crate::model::tracked_location::TrackedLocation;
use crate::repo::task_repo::{RepoResult, TaskStore};
use log::warn;

/// Maps one task into a tracked location when it qualifies for reminders.
pub fn tracked_location_from_task(task: &TaskRecord) -> Option<TrackedLocation> {
    if !task.wants_location_reminder() {
        return None;
    }
    let location = task.location.as_ref()?;
    Some(TrackedLocation {
        id: task.id.clone(),
        title: task.title.clone(),
        latitude: location.latitude,
        longitude: location.longitude,
        range_meters: location.range_meters,
        address: location.address.clone(),
        status: task.status,
    })
}

/// Queries `store` for `user_id` and returns valid tracked locations.
///
/// # Errors
/// - Propagates store query failures unchanged.
pub fn collect_tracked_locations<S: TaskStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> RepoResult<Vec<TrackedLocation>> {
    let tasks = store.query_pending_tasks_with_location(user_id)?;
    let mut records = Vec::with_capacity(tasks.len());

    for task in &tasks {
        let Some(record) = tracked_location_from_task(task) else {
            continue;
        };
        if let Err(err) = record.validate() {
            warn!(
                "event=restore_task module=service status=skipped location_id={} error={}",
                record.id, err
            );
            continue;
        }
        records.push(record);
    }

    Ok(records)
}
