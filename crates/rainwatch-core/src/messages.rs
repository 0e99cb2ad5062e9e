//! JSON frames pushed to live observers.
//!
//! Four frame shapes exist on the wire:
//!
//! ```text
//! late join / start  {"status":"hujan","startedAt":"..","duration":N}
//! end                {"status":"berhenti","startedAt":"..","endedAt":"..","duration":N}
//! tick               {"type":"duration_update","duration":N,"isRaining":true,"startedAt":".."}
//! ```
//!
//! All timestamps are rendered with [`clock::format_display`].

use serde::{Deserialize, Serialize};

use crate::clock::{self, CivilTime};
use crate::episode::CompletedEpisode;

/// Episode status frame, discriminated by the `status` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum RainStatus {
    /// An episode is in progress (sent on start and on late join).
    #[serde(rename = "hujan", rename_all = "camelCase")]
    Raining {
        /// Formatted start time.
        started_at: String,
        /// Seconds elapsed so far.
        duration: u64,
    },
    /// The episode just ended.
    #[serde(rename = "berhenti", rename_all = "camelCase")]
    Stopped {
        /// Formatted start time.
        started_at: String,
        /// Formatted end time.
        ended_at: String,
        /// Final duration in seconds.
        duration: u64,
    },
}

/// Periodic tick frame, tagged `"type": "duration_update"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "duration_update", rename_all = "camelCase")]
pub struct DurationUpdate {
    /// Seconds elapsed so far.
    pub duration: u64,
    /// Always `true`; ticks only run during an episode.
    pub is_raining: bool,
    /// Formatted start time.
    pub started_at: String,
}

/// Any frame an observer can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiveMessage {
    /// Start, end, or late-join status.
    Status(RainStatus),
    /// Once-a-second duration tick.
    DurationUpdate(DurationUpdate),
}

impl LiveMessage {
    /// Status frame for an episode in progress.
    pub fn raining(started_at: &CivilTime, duration: u64) -> Self {
        Self::Status(RainStatus::Raining {
            started_at: clock::format_display(started_at),
            duration,
        })
    }

    /// Status frame for an episode that just ended.
    pub fn stopped(episode: &CompletedEpisode) -> Self {
        Self::Status(RainStatus::Stopped {
            started_at: clock::format_display(&episode.started_at),
            ended_at: clock::format_display(&episode.ended_at),
            duration: episode.duration_secs,
        })
    }

    /// Tick frame for an episode in progress.
    pub fn duration_update(started_at: &CivilTime, duration: u64) -> Self {
        Self::DurationUpdate(DurationUpdate {
            duration,
            is_raining: true,
            started_at: clock::format_display(started_at),
        })
    }

    /// Duration carried by this frame.
    pub const fn duration(&self) -> u64 {
        match self {
            Self::Status(
                RainStatus::Raining { duration, .. } | RainStatus::Stopped { duration, .. },
            )
            | Self::DurationUpdate(DurationUpdate { duration, .. }) => *duration,
        }
    }

    /// Serialize to the JSON text sent over the wire.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
