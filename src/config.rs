//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;

/// Booking core configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Business time zone as a fixed offset from UTC, in minutes.
    /// Drives the local-midnight daily counter reset.
    pub utc_offset_minutes: i32,
    /// How long an assigned worker has to accept or decline.
    pub confirmation_timeout: Duration,
    /// How often the expiration sweeper scans pending confirmations.
    pub sweep_interval: Duration,
    /// Confirmations older than this are purged at startup.
    pub purge_age: Duration,
    /// Directory holding the persisted worker and confirmation documents.
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            confirmation_timeout: Duration::from_secs(120), // 2 minutes
            sweep_interval: Duration::from_secs(30),
            purge_age: Duration::from_secs(3600), // 1 hour
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl AppConfig {
    /// Build the config from `BARBER_ASSIST_*` environment variables,
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let utc_offset_minutes: i32 = std::env::var("BARBER_ASSIST_UTC_OFFSET_MIN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.utc_offset_minutes);

        let confirmation_timeout = std::env::var("BARBER_ASSIST_CONFIRM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.confirmation_timeout);

        let sweep_interval = std::env::var("BARBER_ASSIST_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);

        let purge_age = std::env::var("BARBER_ASSIST_PURGE_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.purge_age);

        let data_dir = std::env::var("BARBER_ASSIST_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        Self {
            utc_offset_minutes,
            confirmation_timeout,
            sweep_interval,
            purge_age,
            data_dir,
        }
    }

    /// The business time zone as a chrono offset.
    ///
    /// Offsets outside the valid ±24 h range fall back to UTC.
    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }
}
