//! HTTP and `WebSocket` server for the Rainwatch service.
//!
//! This crate is the thin plumbing around [`rainwatch_core`]:
//!
//! - **`POST /rain`** -- the sensor pushes `{"isRaining": 0|1}`
//! - **`GET /ws`** (and `GET /`) -- observers receive live JSON frames
//! - **`GET /history`** -- stored episodes, straight from the database
//!
//! # Architecture
//!
//! All live state lives in one [`EpisodeTracker`](rainwatch_core::EpisodeTracker)
//! shared through [`AppState`]. Handlers never touch episode state
//! directly; they forward events to the tracker, which serializes them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, serve_until, start_server};
pub use state::AppState;
