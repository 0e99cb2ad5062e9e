//! Clock and time policy for rain episodes.
//!
//! Every timestamp in the service is a civil time in the sensor's zone,
//! a fixed UTC+07:00 offset. Timestamps only become strings at the edge
//! (live messages, storage records) via [`format_display`]; duration
//! arithmetic always works on the underlying instant.
//!
//! The [`Clock`] trait is the seam used by the state machine so tests
//! can drive time with [`ManualClock`] instead of waiting on the wall
//! clock.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};

/// Offset of the sensor's civil zone from UTC, in seconds (UTC+07:00).
pub const SENSOR_UTC_OFFSET_SECS: i32 = 25_200;

/// `strftime` pattern for every timestamp shown to observers or storage.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// A civil timestamp qualified with its UTC offset.
pub type CivilTime = DateTime<FixedOffset>;

/// Errors that can occur when reading the clock.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The configured UTC offset is out of range.
    #[error("invalid UTC offset: {seconds} seconds")]
    InvalidOffset {
        /// The rejected offset.
        seconds: i32,
    },

    /// The time source could not produce a reading.
    #[error("clock unavailable: {reason}")]
    Unavailable {
        /// Explanation of the failure.
        reason: String,
    },
}

/// Source of "now" in the sensor's civil zone.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Return the current civil time.
    fn now(&self) -> Result<CivilTime, ClockError>;
}

/// Return the sensor's fixed UTC offset.
///
/// # Errors
///
/// Returns [`ClockError::InvalidOffset`] if [`SENSOR_UTC_OFFSET_SECS`] is
/// not a valid offset.
pub fn sensor_offset() -> Result<FixedOffset, ClockError> {
    FixedOffset::east_opt(SENSOR_UTC_OFFSET_SECS).ok_or(ClockError::InvalidOffset {
        seconds: SENSOR_UTC_OFFSET_SECS,
    })
}

/// Render a timestamp with [`DISPLAY_FORMAT`].
pub fn format_display(time: &CivilTime) -> String {
    time.format(DISPLAY_FORMAT).to_string()
}

/// Whole seconds elapsed between two instants.
///
/// Negative spans (clock stepped backwards) clamp to 0.
pub fn elapsed_seconds(from: &CivilTime, to: &CivilTime) -> u64 {
    let secs = to.signed_duration_since(*from).num_seconds();
    u64::try_from(secs).unwrap_or(0)
}

/// Wall clock viewed in the sensor's zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<CivilTime, ClockError> {
        let offset = sensor_offset()?;
        Ok(Utc::now().with_timezone(&offset))
    }
}

/// A clock that only moves when told to.
///
/// Used by tests to make durations deterministic. It can also be switched
/// into a failing mode to exercise clock-error recovery.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<CivilTime>,
    failing: AtomicBool,
}

impl ManualClock {
    /// Create a manual clock frozen at `start`.
    pub const fn new(start: CivilTime) -> Self {
        Self {
            now: Mutex::new(start),
            failing: AtomicBool::new(false),
        }
    }

    /// Move the clock forward (or backward, for negative values) by
    /// `secs` seconds. Out-of-range moves are ignored.
    pub fn advance_secs(&self, secs: i64) {
        let Some(delta) = TimeDelta::try_seconds(secs) else {
            return;
        };
        if let Ok(mut now) = self.now.lock() {
            if let Some(next) = now.checked_add_signed(delta) {
                *now = next;
            }
        }
    }

    /// Make every subsequent [`Clock::now`] call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<CivilTime, ClockError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(ClockError::Unavailable {
                reason: "manual clock set to fail".to_owned(),
            });
        }
        self.now
            .lock()
            .map(|now| *now)
            .map_err(|e| ClockError::Unavailable {
                reason: format!("manual clock lock poisoned: {e}"),
            })
    }
}
