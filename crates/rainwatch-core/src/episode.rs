//! Rain episode state machine.
//!
//! The machine has two states: idle (no episode) and active (an episode
//! started at `started_at`). It only reacts to *edges* of the sensor
//! signal:
//!
//! | Last | New | State | Effect |
//! |------|-----|-------|--------|
//! | dry | raining | idle | start episode, emit [`EpisodeEvent::Started`] |
//! | raining | dry | active | end episode, emit [`EpisodeEvent::Ended`] |
//! | any | any | any | no-op |
//!
//! The last observed signal is recorded after every call so the next
//! call sees the right edge.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::{self, CivilTime, Clock, ClockError};
use crate::store::EpisodeRecord;

/// Sensor payload value that is neither 0 nor 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid rain signal {0}: expected 0 or 1")]
pub struct InvalidSignal(pub u8);

/// One reading from the rain sensor, carried on the wire as `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RainSignal {
    /// Sensor reports no rain (`0`).
    Dry,
    /// Sensor reports rain (`1`).
    Raining,
}

impl RainSignal {
    /// Whether this reading is the raining condition.
    pub const fn is_raining(self) -> bool {
        matches!(self, Self::Raining)
    }
}

impl TryFrom<u8> for RainSignal {
    type Error = InvalidSignal;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Dry),
            1 => Ok(Self::Raining),
            other => Err(InvalidSignal(other)),
        }
    }
}

impl From<RainSignal> for u8 {
    fn from(signal: RainSignal) -> Self {
        match signal {
            RainSignal::Dry => 0,
            RainSignal::Raining => 1,
        }
    }
}

/// A finished episode with its duration frozen at end time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedEpisode {
    /// When the episode began.
    pub started_at: CivilTime,
    /// When the episode ended.
    pub ended_at: CivilTime,
    /// Whole seconds between start and end.
    pub duration_secs: u64,
}

impl CompletedEpisode {
    /// Build the storage record for this episode.
    pub fn to_record(&self) -> EpisodeRecord {
        EpisodeRecord {
            start_time: clock::format_display(&self.started_at),
            end_time: clock::format_display(&self.ended_at),
            duration: self.duration_secs,
        }
    }
}

/// Lifecycle event produced by a signal edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeEvent {
    /// A new episode began. Its duration is 0 at this instant.
    Started {
        /// When the episode began.
        started_at: CivilTime,
    },
    /// The active episode ended.
    Ended(CompletedEpisode),
}

/// Edge-triggered rain episode state machine.
#[derive(Debug)]
pub struct EpisodeMachine {
    clock: Arc<dyn Clock>,
    last_signal: bool,
    started_at: Option<CivilTime>,
}

impl EpisodeMachine {
    /// Create an idle machine whose last observed signal is "dry".
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_signal: false,
            started_at: None,
        }
    }

    /// Feed one sensor reading into the machine.
    ///
    /// Returns the lifecycle event if this reading is an edge that changes
    /// state, or `None` for repeats and for an end signal with no active
    /// episode.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] if an edge fired but the clock could not be
    /// read. The reading is not recorded in that case, so a retry of the
    /// same value still sees the edge.
    pub fn on_signal(&mut self, raining: bool) -> Result<Option<EpisodeEvent>, ClockError> {
        let event = match (self.last_signal, raining, self.started_at) {
            (false, true, None) => {
                let started_at = self.clock.now()?;
                self.started_at = Some(started_at);
                Some(EpisodeEvent::Started { started_at })
            }
            (true, false, Some(started_at)) => {
                let ended_at = self.clock.now()?;
                self.started_at = None;
                Some(EpisodeEvent::Ended(CompletedEpisode {
                    started_at,
                    ended_at,
                    duration_secs: clock::elapsed_seconds(&started_at, &ended_at),
                }))
            }
            _ => None,
        };

        self.last_signal = raining;
        Ok(event)
    }

    /// Seconds since the active episode began, or 0 when idle.
    ///
    /// Never fails: a clock error is logged and reported as 0. The next
    /// query recomputes from `started_at`, so one bad reading does not
    /// accumulate.
    pub fn current_duration(&self) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        match self.clock.now() {
            Ok(now) => clock::elapsed_seconds(&started_at, &now),
            Err(e) => {
                warn!(error = %e, "Failed to read clock for rain duration, reporting 0");
                0
            }
        }
    }

    /// Start time of the active episode, if any.
    pub const fn started_at(&self) -> Option<CivilTime> {
        self.started_at
    }

    /// Whether an episode is in progress.
    pub const fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    /// The last sensor reading seen.
    pub const fn last_signal(&self) -> bool {
        self.last_signal
    }
}
