//! `PostgreSQL` storage for the Rainwatch service.
//!
//! Completed rain episodes are appended to the `rain_history` table and
//! read back, newest first, for the history endpoint. The table is owned
//! by the deployment; this crate only checks that it is reachable at boot.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool and configuration
//! - [`history_store`] -- `rain_history` inserts, reads, and boot check
//! - [`error`] -- shared error types
//!
//! [`PgEpisodeStore`] adapts the pool to the core's
//! [`EpisodeStore`](rainwatch_core::EpisodeStore) trait.

pub mod error;
pub mod history_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use error::DbError;
pub use history_store::{HistoryRow, HistoryStore, PgEpisodeStore};
pub use postgres::{PostgresConfig, PostgresPool};
