//! Monitoring lifecycle controller.
//!
//! # Responsibility
//! - Gate proximity monitoring on session and location permissions.
//! - Own the location feed subscription and route positions to the evaluator.
//! - Start/stop the feed as the registry becomes non-empty/empty.
//!
//! # Invariants
//! - Every transition requires an authenticated session.
//! - At most one live feed subscription exists per monitor.
//! - Feed callbacks carry the generation they were created for; callbacks
//!   from a stopped generation are dropped.
//! - Evaluation passes are serialized by the state lock, so one arrival
//!   notifies at most once.
//! - Collaborator subscribe/unsubscribe calls happen without the state lock.

use crate::config::MonitorConfig;
use crate::geo::distance::GeoPoint;
use crate::model::task_record::TaskRecord;
use crate::model::tracked_location::TrackedLocation;
use crate::platform::{
    AuthProvider, LocationProvider, NotificationDispatcher, PermissionStatus, PlatformResult,
    PositionCallback, SoundPlayer, SubscriptionHandle,
};
use crate::proximity::error::{MonitorError, MonitorResult, PermissionKind};
use crate::proximity::evaluator::{EvaluationReport, ProximityEvaluator};
use crate::proximity::registry::{RegistryEvent, TrackedLocationRegistry};
use crate::repo::task_repo::TaskStore;
use crate::service::restore::{collect_tracked_locations, tracked_location_from_task};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Lifecycle state of a `LocationMonitor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No successful `initialize` since creation or last logout.
    Uninitialized,
    /// Session and permissions are in place; no feed is running.
    Initialized,
    /// A location feed is subscribed and evaluating positions.
    Monitoring,
}

impl MonitorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Monitoring => "monitoring",
        }
    }
}

/// Host collaborators required by the monitor.
#[derive(Clone)]
pub struct MonitorCollaborators {
    pub auth: Arc<dyn AuthProvider>,
    pub location: Arc<dyn LocationProvider>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub sound: Arc<dyn SoundPlayer>,
}

/// Proximity monitoring controller.
///
/// Cloning is cheap; clones share one registry and one feed subscription.
#[derive(Clone)]
pub struct LocationMonitor {
    core: Arc<MonitorCore>,
}

struct MonitorCore {
    auth: Arc<dyn AuthProvider>,
    location: Arc<dyn LocationProvider>,
    evaluator: ProximityEvaluator,
    config: MonitorConfig,
    inner: Mutex<MonitorInner>,
}

struct MonitorInner {
    state: MonitorState,
    registry: TrackedLocationRegistry,
    subscription: Option<SubscriptionHandle>,
    generation: u64,
    /// Generation whose callbacks may act; set from subscribe until stop.
    live_generation: Option<u64>,
}

impl MonitorInner {
    /// Whether an update from `generation` may be evaluated.
    ///
    /// `None` marks a host-pushed position, accepted while monitoring.
    fn accepts(&self, generation: Option<u64>) -> bool {
        match generation {
            Some(generation) => self.live_generation == Some(generation),
            None => self.state == MonitorState::Monitoring,
        }
    }
}

impl LocationMonitor {
    pub fn new(collaborators: MonitorCollaborators, config: MonitorConfig) -> Self {
        let evaluator = ProximityEvaluator::new(
            collaborators.notifier,
            collaborators.sound,
            config.notification_title.clone(),
        );
        Self {
            core: Arc::new(MonitorCore {
                auth: collaborators.auth,
                location: collaborators.location,
                evaluator,
                config,
                inner: Mutex::new(MonitorInner {
                    state: MonitorState::Uninitialized,
                    registry: TrackedLocationRegistry::new(),
                    subscription: None,
                    generation: 0,
                    live_generation: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.core.lock().state
    }

    pub fn is_monitoring(&self) -> bool {
        self.state() == MonitorState::Monitoring
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.core.config
    }

    /// Checks session, platform support and location permissions.
    ///
    /// Calling this while already initialized is a successful no-op. When the
    /// registry already holds records (restore ran first), monitoring starts.
    ///
    /// # Errors
    /// - `NotAuthenticated`, `BackgroundUnsupported`, `PermissionDenied` or
    ///   `Platform`; the monitor stays `Uninitialized`.
    pub fn initialize(&self) -> MonitorResult<()> {
        if self.state() != MonitorState::Uninitialized {
            debug!("event=monitor_init module=proximity status=skipped reason=already_initialized");
            return Ok(());
        }

        if let Err(err) = self.initialize_checks() {
            warn!(
                "event=monitor_init module=proximity status=error error_code={} error={}",
                err.code(),
                err
            );
            return Err(err);
        }

        let has_records = {
            let mut inner = self.core.lock();
            if inner.state == MonitorState::Uninitialized {
                inner.state = MonitorState::Initialized;
            }
            !inner.registry.is_empty()
        };
        info!(
            "event=monitor_init module=proximity status=ok has_records={}",
            has_records
        );

        if has_records {
            // Failures are logged by `start`; initialization itself succeeded.
            let _ = self.start();
        }
        Ok(())
    }

    /// Subscribes to the location feed.
    ///
    /// Already monitoring is a successful no-op.
    ///
    /// # Errors
    /// - `NotAuthenticated`, `NotInitialized`, `NothingToTrack` when
    ///   preconditions fail.
    /// - `FeedSubscriptionFailure` when the platform rejects the feed; the
    ///   monitor stays `Initialized`.
    pub fn start(&self) -> MonitorResult<()> {
        let generation = match self.begin_start() {
            Ok(Some(generation)) => generation,
            Ok(None) => return Ok(()),
            Err(err) => {
                warn!(
                    "event=monitor_start module=proximity status=rejected error_code={}",
                    err.code()
                );
                return Err(err);
            }
        };

        let options = self.core.config.feed_options();
        let callback = feed_callback(Arc::downgrade(&self.core), generation);

        match self.core.location.subscribe(options, callback) {
            Ok(handle) => {
                let mut inner = self.core.lock();
                if inner.live_generation == Some(generation) {
                    inner.subscription = Some(handle);
                    inner.state = MonitorState::Monitoring;
                    info!(
                        "event=monitor_start module=proximity status=ok generation={} tracked={} interval_ms={} min_distance_m={}",
                        generation,
                        inner.registry.len(),
                        options.interval_ms,
                        options.min_distance_meters
                    );
                    return Ok(());
                }
                drop(inner);
                // Stopped while the subscription was being created.
                debug!(
                    "event=monitor_start module=proximity status=superseded generation={}",
                    generation
                );
                self.core.release(handle);
                Ok(())
            }
            Err(err) => {
                let mut inner = self.core.lock();
                if inner.live_generation == Some(generation) {
                    inner.live_generation = None;
                }
                drop(inner);
                error!(
                    "event=monitor_start module=proximity status=error error_code=feed_subscription_failed platform_code={} error={}",
                    err.code, err.message
                );
                Err(MonitorError::FeedSubscriptionFailure(err))
            }
        }
    }

    /// Unsubscribes from the location feed. Idempotent.
    ///
    /// An evaluation pass already running completes; later callbacks are dropped.
    pub fn stop(&self) {
        let handle = {
            let mut inner = self.core.lock();
            if inner.live_generation.is_none() && inner.state != MonitorState::Monitoring {
                return;
            }
            inner.live_generation = None;
            if inner.state == MonitorState::Monitoring {
                inner.state = MonitorState::Initialized;
            }
            inner.subscription.take()
        };

        if let Some(handle) = handle {
            self.core.release(handle);
        }
        info!("event=monitor_stop module=proximity status=ok");
    }

    /// Stops monitoring, clears the registry and resets to `Uninitialized`.
    ///
    /// Safe to call from any state.
    pub fn on_logout(&self) {
        let (handle, cleared) = {
            let mut inner = self.core.lock();
            inner.live_generation = None;
            inner.state = MonitorState::Uninitialized;
            let cleared = inner.registry.len();
            inner.registry.clear();
            (inner.subscription.take(), cleared)
        };

        if let Some(handle) = handle {
            self.core.release(handle);
        }
        info!(
            "event=monitor_logout module=proximity status=ok cleared={}",
            cleared
        );
    }

    /// Adds or replaces one tracked location.
    ///
    /// Starts monitoring when this makes the registry non-empty while initialized.
    /// Completed records are rejected; status changes go through `sync_task`.
    pub fn track(&self, record: TrackedLocation) -> MonitorResult<()> {
        let location_id = record.id.clone();
        let event = self.core.lock().registry.add(record).map_err(|err| {
            warn!(
                "event=location_track module=proximity status=rejected location_id={} error={}",
                location_id, err
            );
            MonitorError::from(err)
        })?;
        debug!(
            "event=location_track module=proximity status=ok location_id={}",
            location_id
        );
        self.apply_registry_event(event);
        Ok(())
    }

    /// Removes one tracked location; absent ids are a no-op.
    ///
    /// Stops monitoring when the registry becomes empty.
    pub fn untrack(&self, id: &str) {
        let event = self.core.lock().registry.remove(id);
        debug!(
            "event=location_untrack module=proximity status=ok location_id={}",
            id
        );
        self.apply_registry_event(event);
    }

    /// Removes all tracked locations and stops monitoring.
    pub fn clear_tracked(&self) {
        let event = self.core.lock().registry.clear();
        self.apply_registry_event(event);
        // Registry may already be empty while a feed is still live.
        self.stop();
    }

    /// Returns a snapshot of tracked locations.
    pub fn tracked_locations(&self) -> Vec<TrackedLocation> {
        self.core.lock().registry.list()
    }

    /// Applies a task create/update to the registry.
    ///
    /// Returns `true` when the task is now tracked, `false` when it was
    /// dropped from tracking (completed, reminder disabled or no location).
    pub fn sync_task(&self, task: &TaskRecord) -> MonitorResult<bool> {
        match tracked_location_from_task(task) {
            Some(record) => {
                self.track(record)?;
                Ok(true)
            }
            None => {
                self.untrack(&task.id);
                Ok(false)
            }
        }
    }

    /// Rebuilds the registry from the task store for `user_id`.
    ///
    /// Returns the number of tracked locations after restore.
    ///
    /// # Errors
    /// - `NotAuthenticated` when no session exists or it belongs to another user.
    /// - `StoreQueryFailure` when the store query fails; the registry is unchanged.
    pub fn restore<S: TaskStore + ?Sized>(&self, store: &S, user_id: &str) -> MonitorResult<usize> {
        if self.core.auth.current_user().as_deref() != Some(user_id) {
            warn!("event=monitor_restore module=proximity status=rejected error_code=not_authenticated");
            return Err(MonitorError::NotAuthenticated);
        }

        let records = match collect_tracked_locations(store, user_id) {
            Ok(records) => records,
            Err(err) => {
                error!(
                    "event=monitor_restore module=proximity status=error error_code=store_query_failed error={}",
                    err
                );
                return Err(MonitorError::StoreQueryFailure(err));
            }
        };

        let restored = {
            let mut inner = self.core.lock();
            inner.registry.replace_all(records)?;
            inner.registry.len()
        };
        info!(
            "event=monitor_restore module=proximity status=ok restored={}",
            restored
        );

        if restored == 0 {
            self.stop();
        } else if self.state() == MonitorState::Initialized {
            let _ = self.start();
        }
        Ok(restored)
    }

    /// Evaluates a host-supplied position while monitoring.
    ///
    /// Returns `None` when the monitor is not monitoring or the session ended.
    pub fn handle_position(&self, position: GeoPoint) -> Option<EvaluationReport> {
        self.evaluate_position(None, position)
    }

    /// Queries the current position once and evaluates it while monitoring.
    pub fn check_current_position(&self) -> MonitorResult<Option<EvaluationReport>> {
        if !self.is_monitoring() {
            return Ok(None);
        }
        let position = self.core.location.current_position().map_err(|err| {
            warn!(
                "event=position_query module=proximity status=error platform_code={}",
                err.code
            );
            MonitorError::Platform(err)
        })?;
        Ok(self.evaluate_position(None, position))
    }

    fn initialize_checks(&self) -> MonitorResult<()> {
        if self.core.auth.current_user().is_none() {
            return Err(MonitorError::NotAuthenticated);
        }
        if !self.core.location.supports_background_updates() {
            return Err(MonitorError::BackgroundUnsupported);
        }
        require_permission(
            PermissionKind::Foreground,
            self.core.location.request_foreground_permission(),
        )?;
        require_permission(
            PermissionKind::Background,
            self.core.location.request_background_permission(),
        )?;
        Ok(())
    }

    /// Validates start preconditions and reserves a new feed generation.
    ///
    /// Returns `Ok(None)` when a feed is already live or being created.
    fn begin_start(&self) -> MonitorResult<Option<u64>> {
        if self.core.auth.current_user().is_none() {
            return Err(MonitorError::NotAuthenticated);
        }

        let mut inner = self.core.lock();
        match inner.state {
            MonitorState::Uninitialized => return Err(MonitorError::NotInitialized),
            MonitorState::Monitoring => return Ok(None),
            MonitorState::Initialized => {}
        }
        if inner.live_generation.is_some() {
            return Ok(None);
        }
        if inner.registry.is_empty() {
            return Err(MonitorError::NothingToTrack);
        }

        inner.generation += 1;
        inner.live_generation = Some(inner.generation);
        Ok(Some(inner.generation))
    }

    fn evaluate_position(
        &self,
        generation: Option<u64>,
        position: GeoPoint,
    ) -> Option<EvaluationReport> {
        // Stale callbacks must not touch lifecycle state.
        if !self.core.lock().accepts(generation) {
            debug!(
                "event=position_update module=proximity status=dropped reason=stale generation={:?}",
                generation
            );
            return None;
        }

        if self.core.auth.current_user().is_none() {
            warn!("event=position_update module=proximity status=rejected error_code=not_authenticated");
            self.stop();
            return None;
        }

        let report = {
            let mut inner = self.core.lock();
            // A stop may have landed since the first check.
            if !inner.accepts(generation) {
                return None;
            }
            self.core.evaluator.evaluate(&mut inner.registry, position)
        };

        if report.became_empty() {
            self.stop();
        }
        Some(report)
    }

    fn apply_registry_event(&self, event: Option<RegistryEvent>) {
        match event {
            Some(RegistryEvent::BecameNonEmpty) => {
                if self.state() == MonitorState::Initialized {
                    let _ = self.start();
                }
            }
            Some(RegistryEvent::BecameEmpty) => self.stop(),
            None => {}
        }
    }
}

impl MonitorCore {
    fn lock(&self) -> MutexGuard<'_, MonitorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, handle: SubscriptionHandle) {
        if let Err(err) = self.location.unsubscribe(handle) {
            warn!(
                "event=feed_unsubscribe module=proximity status=error subscription={} platform_code={}",
                handle.0, err.code
            );
        }
    }
}

impl Drop for MonitorCore {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = inner.subscription.take() {
            self.release(handle);
        }
    }
}

fn feed_callback(core: Weak<MonitorCore>, generation: u64) -> PositionCallback {
    Box::new(move |position| {
        if let Some(core) = core.upgrade() {
            LocationMonitor { core }.evaluate_position(Some(generation), position);
        }
    })
}

fn require_permission(
    kind: PermissionKind,
    result: PlatformResult<PermissionStatus>,
) -> MonitorResult<()> {
    match result? {
        PermissionStatus::Granted => Ok(()),
        PermissionStatus::Denied => Err(MonitorError::PermissionDenied(kind)),
    }
}
