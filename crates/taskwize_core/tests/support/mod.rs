//! Host collaborator fakes shared by integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use taskwize_core::{
    AuthProvider, FeedOptions, GeoPoint, LocationMonitor, LocationProvider, MonitorCollaborators,
    MonitorConfig, NotificationDispatcher, NotificationId, PermissionStatus, PlatformError,
    PlatformResult, PositionCallback, SoundPlayer, SubscriptionHandle, TrackedLocation,
};

pub struct FakeAuth {
    user: Mutex<Option<String>>,
}

impl FakeAuth {
    pub fn signed_in(user_id: &str) -> Self {
        Self {
            user: Mutex::new(Some(user_id.to_string())),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: Mutex::new(None),
        }
    }

    pub fn set_user(&self, user_id: Option<&str>) {
        *self.user.lock().unwrap() = user_id.map(str::to_string);
    }
}

impl AuthProvider for FakeAuth {
    fn current_user(&self) -> Option<String> {
        self.user.lock().unwrap().clone()
    }
}

pub struct FakeLocation {
    pub foreground: Mutex<PlatformResult<PermissionStatus>>,
    pub background: Mutex<PlatformResult<PermissionStatus>>,
    pub background_supported: AtomicBool,
    pub subscribe_error: Mutex<Option<PlatformError>>,
    /// Delivered from inside `subscribe`, before it returns.
    pub position_on_subscribe: Mutex<Option<GeoPoint>>,
    pub current: Mutex<PlatformResult<GeoPoint>>,
    pub subscribe_calls: AtomicUsize,
    pub last_options: Mutex<Option<FeedOptions>>,
    pub unsubscribed: Mutex<Vec<SubscriptionHandle>>,
    callbacks: Mutex<Vec<(SubscriptionHandle, Arc<PositionCallback>)>>,
    next_handle: AtomicU64,
}

impl Default for FakeLocation {
    fn default() -> Self {
        Self {
            foreground: Mutex::new(Ok(PermissionStatus::Granted)),
            background: Mutex::new(Ok(PermissionStatus::Granted)),
            background_supported: AtomicBool::new(true),
            subscribe_error: Mutex::new(None),
            position_on_subscribe: Mutex::new(None),
            current: Mutex::new(Err(PlatformError::new("no_fix", "no position yet"))),
            subscribe_calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
            unsubscribed: Mutex::new(Vec::new()),
            callbacks: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
        }
    }
}

impl FakeLocation {
    pub fn active_subscriptions(&self) -> usize {
        let unsubscribed = self.unsubscribed.lock().unwrap().clone();
        self.callbacks
            .lock()
            .unwrap()
            .iter()
            .filter(|(handle, _)| !unsubscribed.contains(handle))
            .count()
    }

    /// Delivers `position` to every subscription still active.
    pub fn emit(&self, position: GeoPoint) {
        let unsubscribed = self.unsubscribed.lock().unwrap().clone();
        let callbacks: Vec<Arc<PositionCallback>> = self
            .callbacks
            .lock()
            .unwrap()
            .iter()
            .filter(|(handle, _)| !unsubscribed.contains(handle))
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            (callback.as_ref())(position);
        }
    }

    /// Delivers `position` only to callbacks already unsubscribed.
    pub fn emit_to_unsubscribed(&self, position: GeoPoint) {
        let unsubscribed = self.unsubscribed.lock().unwrap().clone();
        let callbacks: Vec<Arc<PositionCallback>> = self
            .callbacks
            .lock()
            .unwrap()
            .iter()
            .filter(|(handle, _)| unsubscribed.contains(handle))
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            (callback.as_ref())(position);
        }
    }

    /// Delivers `position` to every callback ever registered, simulating
    /// late updates that race with unsubscribe.
    pub fn emit_including_stopped(&self, position: GeoPoint) {
        let callbacks: Vec<Arc<PositionCallback>> = self
            .callbacks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            (callback.as_ref())(position);
        }
    }
}

impl LocationProvider for FakeLocation {
    fn supports_background_updates(&self) -> bool {
        self.background_supported.load(Ordering::SeqCst)
    }

    fn request_foreground_permission(&self) -> PlatformResult<PermissionStatus> {
        self.foreground.lock().unwrap().clone()
    }

    fn request_background_permission(&self) -> PlatformResult<PermissionStatus> {
        self.background.lock().unwrap().clone()
    }

    fn current_position(&self) -> PlatformResult<GeoPoint> {
        self.current.lock().unwrap().clone()
    }

    fn subscribe(
        &self,
        options: FeedOptions,
        callback: PositionCallback,
    ) -> PlatformResult<SubscriptionHandle> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options);
        if let Some(err) = self.subscribe_error.lock().unwrap().clone() {
            return Err(err);
        }

        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let callback = Arc::new(callback);
        self.callbacks
            .lock()
            .unwrap()
            .push((handle, callback.clone()));

        let immediate = *self.position_on_subscribe.lock().unwrap();
        if let Some(position) = immediate {
            (callback.as_ref())(position);
        }
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> PlatformResult<()> {
        self.unsubscribed.lock().unwrap().push(handle);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

impl NotificationDispatcher for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) -> PlatformResult<Option<NotificationId>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlatformError::new("dispatch_failed", "notifications offline"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((title.to_string(), body.to_string()));
        Ok(Some(format!("notification-{}", sent.len())))
    }
}

#[derive(Default)]
pub struct FakeSound {
    pub enabled: AtomicBool,
    pub played: AtomicUsize,
}

impl SoundPlayer for FakeSound {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn play_effect(&self) -> PlatformResult<()> {
        self.played.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub auth: Arc<FakeAuth>,
    pub location: Arc<FakeLocation>,
    pub notifier: Arc<RecordingNotifier>,
    pub sound: Arc<FakeSound>,
    pub monitor: LocationMonitor,
}

impl Harness {
    pub fn signed_in() -> Self {
        Self::with_auth(FakeAuth::signed_in("user-1"))
    }

    pub fn with_auth(auth: FakeAuth) -> Self {
        let auth = Arc::new(auth);
        let location = Arc::new(FakeLocation::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let sound = Arc::new(FakeSound::default());
        let monitor = LocationMonitor::new(
            MonitorCollaborators {
                auth: auth.clone(),
                location: location.clone(),
                notifier: notifier.clone(),
                sound: sound.clone(),
            },
            MonitorConfig::default(),
        );
        Self {
            auth,
            location,
            notifier,
            sound,
            monitor,
        }
    }
}

pub fn scenario_record() -> TrackedLocation {
    TrackedLocation::new("t1", "Pick up dry cleaning", 37.0, -122.0, 100.0)
}

/// About 30 m north of the scenario record.
pub fn thirty_meters_away() -> GeoPoint {
    GeoPoint::new(37.00027, -122.0)
}

/// About 500 m north of the scenario record.
pub fn five_hundred_meters_away() -> GeoPoint {
    GeoPoint::new(37.0045, -122.0)
}
