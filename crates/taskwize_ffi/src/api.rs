//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Bridge host-owned platform services (session, permissions, position
//!   stream, notifications, sound) into the core monitor.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - One monitor instance exists per process.
//! - Notifications are queued in Rust and delivered by the host through
//!   `monitor_drain_notifications`.

use log::{info, warn};
use taskwize_core::db::open_db;
use taskwize_core::{
    core_version as core_version_inner, distance_meters as distance_meters_inner,
    init_logging as init_logging_inner, ping as ping_inner, AuthProvider, FeedOptions, GeoPoint,
    LocationMonitor, LocationProvider, MonitorCollaborators, MonitorConfig, MonitorError,
    NotificationDispatcher, NotificationId, PermissionStatus, PlatformError, PlatformResult,
    PositionCallback, SoundPlayer, SqliteTaskRepository, SubscriptionHandle, TrackedLocation,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

const DB_FILE_NAME: &str = "taskwize_tasks.sqlite3";
const DB_PATH_ENV: &str = "TASKWIZE_DB_PATH";
const MONITOR_CONFIG_ENV: &str = "TASKWIZE_MONITOR_CONFIG";

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static RUNTIME: OnceLock<HostRuntime> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Great-circle distance in meters between two coordinates.
#[flutter_rust_bridge::frb(sync)]
pub fn distance_meters(
    start_latitude: f64,
    start_longitude: f64,
    end_latitude: f64,
    end_longitude: f64,
) -> f64 {
    distance_meters_inner(start_latitude, start_longitude, end_latitude, end_longitude)
}

/// Generic action response envelope for monitor commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Stable machine-readable error code on failure.
    pub error_code: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl MonitorActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(operation: &str, err: &MonitorError) -> Self {
        Self {
            ok: false,
            error_code: Some(err.code().to_string()),
            message: format!("{operation} failed: {err}"),
        }
    }

    fn rejected(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_code: Some(error_code.to_string()),
            message: message.into(),
        }
    }
}

/// Outcome of one pushed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionResponse {
    /// False when the monitor was not monitoring, so nothing was checked.
    pub evaluated: bool,
    /// Ids of tasks whose radius was entered by this position.
    pub arrived_task_ids: Vec<String>,
    /// Number of arrivals whose notification could not be queued.
    pub failed_count: u32,
}

/// Notification queued for the host to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostNotification {
    pub notification_id: String,
    pub title: String,
    pub body: String,
    /// Whether the host should play the arrival sound before showing it.
    pub play_sound: bool,
}

/// Snapshot of monitor state for diagnostics/UI.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStateResponse {
    /// One of `uninitialized|initialized|monitoring`.
    pub state: String,
    pub tracked_count: u32,
    /// Whether the host should keep its platform position stream running.
    pub feed_active: bool,
    pub feed_interval_ms: u64,
    pub feed_min_distance_meters: f64,
}

/// Sets or clears the signed-in user as seen by the monitor.
///
/// Clearing the session does not stop monitoring by itself; the next pushed
/// position observes the missing session and stops the feed.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_set_session(user_id: Option<String>) {
    let user_id = user_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    runtime().auth.set(user_id);
}

/// Records the OS permission state resolved by the host.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_set_permissions(
    foreground_granted: bool,
    background_granted: bool,
    background_supported: bool,
) {
    runtime()
        .location
        .set_permissions(foreground_granted, background_granted, background_supported);
}

/// Toggles the arrival sound preference.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_set_sound_enabled(enabled: bool) {
    runtime()
        .notifications
        .sound_enabled
        .store(enabled, Ordering::SeqCst);
}

/// Initializes the monitor; starts the feed when tasks are already tracked.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Idempotent once initialized.
/// - Never panics; failures carry a stable `error_code`.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_initialize() -> MonitorActionResponse {
    let monitor = &runtime().monitor;
    match monitor.initialize() {
        Ok(()) => MonitorActionResponse::success(format!(
            "Monitor {}.",
            monitor.state().as_str()
        )),
        Err(err) => MonitorActionResponse::failure("monitor_initialize", &err),
    }
}

/// Tracks a task location, replacing any record with the same id.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_track_task(
    task_id: String,
    title: String,
    latitude: f64,
    longitude: f64,
    range_meters: f64,
    address: Option<String>,
) -> MonitorActionResponse {
    let mut record = TrackedLocation::new(
        task_id.trim(),
        title.trim(),
        latitude,
        longitude,
        range_meters,
    );
    if let Some(address) = address.filter(|value| !value.trim().is_empty()) {
        record = record.with_address(address.trim());
    }

    match runtime().monitor.track(record) {
        Ok(()) => MonitorActionResponse::success("Task tracked."),
        Err(err) => MonitorActionResponse::failure("monitor_track_task", &err),
    }
}

/// Stops tracking a task. Unknown ids are accepted silently.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_untrack_task(task_id: String) -> MonitorActionResponse {
    runtime().monitor.untrack(task_id.trim());
    MonitorActionResponse::success("Task untracked.")
}

/// Rebuilds the tracked set from the local task store for `user_id`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_restore(user_id: String) -> MonitorActionResponse {
    let db_path = resolve_db_path();
    let conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            return MonitorActionResponse::rejected(
                "store_query_failed",
                format!("monitor_restore DB open failed: {err}"),
            );
        }
    };
    let repo = match SqliteTaskRepository::try_new(&conn) {
        Ok(repo) => repo,
        Err(err) => {
            return MonitorActionResponse::rejected(
                "store_query_failed",
                format!("monitor_restore repo init failed: {err}"),
            );
        }
    };

    match runtime().monitor.restore(&repo, user_id.trim()) {
        Ok(count) => MonitorActionResponse::success(format!("Restored {count} task(s).")),
        Err(err) => MonitorActionResponse::failure("monitor_restore", &err),
    }
}

/// Feeds one device position from the host's platform stream.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_push_position(latitude: f64, longitude: f64) -> PositionResponse {
    let runtime = runtime();
    let position = GeoPoint::new(latitude, longitude);
    runtime.location.record_position(position);

    match runtime.monitor.handle_position(position) {
        Some(report) => PositionResponse {
            evaluated: true,
            arrived_task_ids: report.arrived,
            failed_count: u32::try_from(report.failed.len()).unwrap_or(u32::MAX),
        },
        None => PositionResponse {
            evaluated: false,
            arrived_task_ids: Vec::new(),
            failed_count: 0,
        },
    }
}

/// Returns and clears every queued notification, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_drain_notifications() -> Vec<HostNotification> {
    runtime().notifications.drain()
}

/// Clears the session, the tracked set and any queued notifications.
#[flutter_rust_bridge::frb(sync)]
pub fn monitor_logout() {
    let runtime = runtime();
    runtime.auth.set(None);
    runtime.monitor.on_logout();
    let dropped = runtime.notifications.drain().len();
    if dropped > 0 {
        info!(
            "event=ffi_logout module=ffi status=ok dropped_notifications={}",
            dropped
        );
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn monitor_state() -> MonitorStateResponse {
    let runtime = runtime();
    let options = runtime.monitor.config().feed_options();
    MonitorStateResponse {
        state: runtime.monitor.state().as_str().to_string(),
        tracked_count: u32::try_from(runtime.monitor.tracked_locations().len())
            .unwrap_or(u32::MAX),
        feed_active: runtime.location.feed_active(),
        feed_interval_ms: options.interval_ms,
        feed_min_distance_meters: options.min_distance_meters,
    }
}

struct HostRuntime {
    auth: Arc<HostAuth>,
    location: Arc<HostLocation>,
    notifications: Arc<HostNotifications>,
    monitor: LocationMonitor,
}

fn runtime() -> &'static HostRuntime {
    RUNTIME.get_or_init(|| {
        let auth = Arc::new(HostAuth::default());
        let location = Arc::new(HostLocation::default());
        let notifications = Arc::new(HostNotifications::default());
        let monitor = LocationMonitor::new(
            MonitorCollaborators {
                auth: auth.clone(),
                location: location.clone(),
                notifier: notifications.clone(),
                sound: notifications.clone(),
            },
            resolve_monitor_config(),
        );
        HostRuntime {
            auth,
            location,
            notifications,
            monitor,
        }
    })
}

fn resolve_monitor_config() -> MonitorConfig {
    let Ok(raw) = std::env::var(MONITOR_CONFIG_ENV) else {
        return MonitorConfig::default();
    };
    match MonitorConfig::from_json_str(&raw) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "event=ffi_config module=ffi status=fallback error={}",
                err
            );
            MonitorConfig::default()
        }
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct HostAuth {
    user_id: Mutex<Option<String>>,
}

impl HostAuth {
    fn set(&self, user_id: Option<String>) {
        *lock(&self.user_id) = user_id;
    }
}

impl AuthProvider for HostAuth {
    fn current_user(&self) -> Option<String> {
        lock(&self.user_id).clone()
    }
}

/// Location provider whose state is pushed by the host.
///
/// Permission prompts happen on the Dart side; this adapter only reports the
/// resolved outcome. Positions arrive through `monitor_push_position`, so the
/// subscription only marks the platform stream as wanted.
struct HostLocation {
    foreground_granted: AtomicBool,
    background_granted: AtomicBool,
    background_supported: AtomicBool,
    last_position: Mutex<Option<GeoPoint>>,
    active: Mutex<Option<SubscriptionHandle>>,
    next_handle: AtomicU64,
}

impl Default for HostLocation {
    fn default() -> Self {
        Self {
            foreground_granted: AtomicBool::new(false),
            background_granted: AtomicBool::new(false),
            background_supported: AtomicBool::new(true),
            last_position: Mutex::new(None),
            active: Mutex::new(None),
            next_handle: AtomicU64::new(1),
        }
    }
}

impl HostLocation {
    fn set_permissions(&self, foreground: bool, background: bool, background_supported: bool) {
        self.foreground_granted.store(foreground, Ordering::SeqCst);
        self.background_granted.store(background, Ordering::SeqCst);
        self.background_supported
            .store(background_supported, Ordering::SeqCst);
    }

    fn record_position(&self, position: GeoPoint) {
        *lock(&self.last_position) = Some(position);
    }

    fn feed_active(&self) -> bool {
        lock(&self.active).is_some()
    }
}

fn permission_from(granted: bool) -> PermissionStatus {
    if granted {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    }
}

impl LocationProvider for HostLocation {
    fn supports_background_updates(&self) -> bool {
        self.background_supported.load(Ordering::SeqCst)
    }

    fn request_foreground_permission(&self) -> PlatformResult<PermissionStatus> {
        Ok(permission_from(
            self.foreground_granted.load(Ordering::SeqCst),
        ))
    }

    fn request_background_permission(&self) -> PlatformResult<PermissionStatus> {
        Ok(permission_from(
            self.background_granted.load(Ordering::SeqCst),
        ))
    }

    fn current_position(&self) -> PlatformResult<GeoPoint> {
        (*lock(&self.last_position))
            .ok_or_else(|| PlatformError::new("no_fix", "host has not pushed a position yet"))
    }

    fn subscribe(
        &self,
        options: FeedOptions,
        _callback: PositionCallback,
    ) -> PlatformResult<SubscriptionHandle> {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        *lock(&self.active) = Some(handle);
        info!(
            "event=ffi_feed_subscribe module=ffi status=ok handle={} interval_ms={}",
            handle.0, options.interval_ms
        );
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> PlatformResult<()> {
        let mut active = lock(&self.active);
        if *active == Some(handle) {
            *active = None;
        }
        Ok(())
    }
}

/// Notification outbox plus the sound preference.
#[derive(Default)]
struct HostNotifications {
    sound_enabled: AtomicBool,
    sound_pending: AtomicBool,
    outbox: Mutex<Vec<HostNotification>>,
    next_id: AtomicU64,
}

impl HostNotifications {
    fn drain(&self) -> Vec<HostNotification> {
        std::mem::take(&mut *lock(&self.outbox))
    }
}

impl NotificationDispatcher for HostNotifications {
    fn notify(&self, title: &str, body: &str) -> PlatformResult<Option<NotificationId>> {
        let sequence = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let notification_id = format!("taskwize-{sequence}");
        lock(&self.outbox).push(HostNotification {
            notification_id: notification_id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            play_sound: self.sound_pending.swap(false, Ordering::SeqCst),
        });
        Ok(Some(notification_id))
    }
}

impl SoundPlayer for HostNotifications {
    fn is_enabled(&self) -> bool {
        self.sound_enabled.load(Ordering::SeqCst)
    }

    fn play_effect(&self) -> PlatformResult<()> {
        // Played by the host together with the next queued notification.
        self.sound_pending.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, distance_meters, init_logging, monitor_drain_notifications,
        monitor_initialize, monitor_logout, monitor_push_position, monitor_restore,
        monitor_set_permissions, monitor_set_session, monitor_set_sound_enabled, monitor_state,
        monitor_track_task, monitor_untrack_task, ping, resolve_db_path,
    };
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::{SystemTime, UNIX_EPOCH};
    use taskwize_core::db::open_db;
    use taskwize_core::{SqliteTaskRepository, TaskLocation, TaskRecord, TaskStatus};

    // Monitor state is process-wide; serialize the tests that drive it.
    static MONITOR_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn fresh_monitor(user_id: &str) -> MutexGuard<'static, ()> {
        let guard = MONITOR_TEST_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        monitor_logout();
        monitor_set_session(Some(user_id.to_string()));
        monitor_set_permissions(true, true, true);
        monitor_set_sound_enabled(false);
        guard
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn distance_meters_matches_one_degree_of_latitude() {
        let meters = distance_meters(0.0, 0.0, 1.0, 0.0);
        assert!((meters - 111_195.0).abs() < 1.0, "{meters}");
    }

    #[test]
    fn initialize_requires_session() {
        let _guard = fresh_monitor("ffi-user");
        monitor_set_session(None);

        let response = monitor_initialize();
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("not_authenticated"));
        assert_eq!(monitor_state().state, "uninitialized");
    }

    #[test]
    fn initialize_reports_denied_background_permission() {
        let _guard = fresh_monitor("ffi-user");
        monitor_set_permissions(true, false, true);

        let response = monitor_initialize();
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("permission_denied"));
    }

    #[test]
    fn arrival_queues_one_notification_and_stops_feed() {
        let _guard = fresh_monitor("ffi-user");
        monitor_set_sound_enabled(true);

        let tracked = monitor_track_task(
            "t1".to_string(),
            "Pick up dry cleaning".to_string(),
            37.0,
            -122.0,
            100.0,
            None,
        );
        assert!(tracked.ok, "{}", tracked.message);
        let initialized = monitor_initialize();
        assert!(initialized.ok, "{}", initialized.message);

        let state = monitor_state();
        assert_eq!(state.state, "monitoring");
        assert!(state.feed_active);
        assert_eq!(state.tracked_count, 1);

        let far = monitor_push_position(37.0045, -122.0);
        assert!(far.evaluated);
        assert!(far.arrived_task_ids.is_empty());
        assert!(monitor_drain_notifications().is_empty());

        let near = monitor_push_position(37.00027, -122.0);
        assert_eq!(near.arrived_task_ids, vec!["t1".to_string()]);
        assert_eq!(near.failed_count, 0);

        let queued = monitor_drain_notifications();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].body, "Pick up dry cleaning");
        assert!(queued[0].play_sound);
        assert!(monitor_drain_notifications().is_empty());

        let state = monitor_state();
        assert_eq!(state.state, "initialized");
        assert!(!state.feed_active);

        let after = monitor_push_position(37.00027, -122.0);
        assert!(!after.evaluated);
    }

    #[test]
    fn track_rejects_non_positive_range() {
        let _guard = fresh_monitor("ffi-user");

        let response = monitor_track_task(
            "t1".to_string(),
            "bad".to_string(),
            37.0,
            -122.0,
            0.0,
            None,
        );
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("invalid_location"));
        assert_eq!(monitor_state().tracked_count, 0);
    }

    #[test]
    fn untracking_last_task_stops_feed() {
        let _guard = fresh_monitor("ffi-user");
        assert!(monitor_initialize().ok);
        assert!(
            monitor_track_task(
                "t1".to_string(),
                String::new(),
                37.0,
                -122.0,
                100.0,
                Some("500 Market St".to_string()),
            )
            .ok
        );
        assert_eq!(monitor_state().state, "monitoring");

        assert!(monitor_untrack_task("t1".to_string()).ok);
        let state = monitor_state();
        assert_eq!(state.state, "initialized");
        assert!(!state.feed_active);
    }

    #[test]
    fn restore_loads_pending_tasks_from_store() {
        let user_id = unique_token("ffi-restore");
        let _guard = fresh_monitor(&user_id);
        {
            let conn = open_db(resolve_db_path()).expect("open db");
            let repo = SqliteTaskRepository::try_new(&conn).expect("repo");
            let location = TaskLocation {
                latitude: 37.0,
                longitude: -122.0,
                range_meters: 100.0,
                address: None,
            };
            let pending = TaskRecord::new(user_id.as_str(), "pending")
                .with_location_reminder(location.clone());
            let mut done =
                TaskRecord::new(user_id.as_str(), "done").with_location_reminder(location);
            done.status = TaskStatus::Completed;
            repo.upsert_task(&pending).expect("insert pending");
            repo.upsert_task(&done).expect("insert done");
        }

        assert!(monitor_initialize().ok);
        let response = monitor_restore(user_id.clone());
        assert!(response.ok, "{}", response.message);
        assert!(response.message.contains("Restored 1"));
        let state = monitor_state();
        assert_eq!(state.tracked_count, 1);
        assert_eq!(state.state, "monitoring");
    }

    #[test]
    fn restore_rejects_other_user() {
        let _guard = fresh_monitor("ffi-user");

        let response = monitor_restore("someone-else".to_string());
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("not_authenticated"));
    }

    #[test]
    fn logout_resets_monitor_and_outbox() {
        let _guard = fresh_monitor("ffi-user");
        assert!(
            monitor_track_task(
                "t1".to_string(),
                "title".to_string(),
                37.0,
                -122.0,
                100.0,
                None,
            )
            .ok
        );
        assert!(monitor_initialize().ok);
        monitor_push_position(37.0, -122.0);

        monitor_logout();

        let state = monitor_state();
        assert_eq!(state.state, "uninitialized");
        assert_eq!(state.tracked_count, 0);
        assert!(!state.feed_active);
        assert!(monitor_drain_notifications().is_empty());
    }
}
