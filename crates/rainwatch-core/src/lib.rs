//! Rain episode tracking core for the Rainwatch service.
//!
//! This crate owns everything that has real behavior in the service:
//!
//! - **Time policy** ([`clock`]) -- "now" in the sensor's fixed civil
//!   zone (UTC+07:00) and the `DD/MM/YYYY HH:mm:ss` display format
//! - **Episode state machine** ([`episode`]) -- edge detection on the
//!   binary rain signal, at most one active episode
//! - **Live messages** ([`messages`]) -- the JSON frames pushed to observers
//! - **Fan-out** ([`fanout`]) -- per-observer independent delivery
//! - **Broadcast loop** ([`ticker`]) -- the once-a-second duration timer
//! - **Storage hand-off** ([`store`]) -- fire-and-forget persistence of
//!   completed episodes
//! - **Tracker** ([`tracker`]) -- the single object that serializes every
//!   event against the state above
//!
//! # Architecture
//!
//! ```text
//! POST /rain ──> EpisodeTracker::on_signal ──┬─> EpisodeMachine
//!                                             ├─> BroadcastLoop (arm/disarm)
//!                                             ├─> ObserverRegistry::broadcast
//!                                             └─> store::dispatch (spawned)
//! BroadcastLoop tick ──> EpisodeTracker::tick ──> ObserverRegistry::broadcast
//! WebSocket connect ──> EpisodeTracker::register (late-join snapshot)
//! ```

pub mod clock;
pub mod episode;
pub mod fanout;
pub mod messages;
pub mod store;
pub mod ticker;
pub mod tracker;

// Re-export primary types for convenience.
pub use clock::{CivilTime, Clock, ClockError, ManualClock, SystemClock};
pub use episode::{CompletedEpisode, EpisodeEvent, EpisodeMachine, RainSignal};
pub use fanout::{
    ChannelObserver, DeliveryError, FanoutReport, Observer, ObserverId, ObserverRegistry,
};
pub use messages::LiveMessage;
pub use store::{EpisodeRecord, EpisodeStore, HistoryEntry, MemoryStore, StoreError};
pub use ticker::BroadcastLoop;
pub use tracker::{DEFAULT_TICK_INTERVAL, EpisodeTracker};
