//! Proximity monitoring configuration.
//!
//! # Responsibility
//! - Hold tunables for the location feed and notification copy.
//! - Parse host-provided JSON with per-field defaults.
//!
//! # Invariants
//! - `update_interval_ms > 0`.
//! - `min_distance_meters` is finite and non-negative.
//! - `notification_title` is not blank.

use crate::platform::FeedOptions;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_MIN_DISTANCE_METERS: f64 = 50.0;
pub const DEFAULT_NOTIFICATION_TITLE: &str = "You're near a task";

/// Tunables for `LocationMonitor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Desired interval between location feed updates.
    pub update_interval_ms: u64,
    /// Movement threshold below which the platform suppresses updates.
    pub min_distance_meters: f64,
    /// Title of every arrival notification.
    pub notification_title: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            min_distance_meters: DEFAULT_MIN_DISTANCE_METERS,
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Parses and validates a JSON config document.
    ///
    /// Missing fields take their defaults; unknown fields are rejected.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Feed options requested from the location provider.
    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            interval_ms: self.update_interval_ms,
            min_distance_meters: self.min_distance_meters,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "update_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.min_distance_meters.is_finite() && self.min_distance_meters >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_distance_meters must be finite and non-negative, got {}",
                self.min_distance_meters
            )));
        }
        if self.notification_title.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "notification_title must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid monitor config JSON: {message}"),
            Self::Invalid(message) => write!(f, "invalid monitor config: {message}"),
        }
    }
}

impl Error for ConfigError {}
