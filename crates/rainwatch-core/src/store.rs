//! Storage hand-off for completed episodes.
//!
//! The core never waits on storage. [`dispatch`] spawns the save on its
//! own task and only logs the outcome: a failed save is reported with the
//! full record so it can be rebuilt by hand, and is never retried or
//! queued. At-most-once delivery is the policy.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Row submitted to storage when an episode ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Formatted start time.
    pub start_time: String,
    /// Formatted end time.
    pub end_time: String,
    /// Duration in seconds.
    pub duration: u64,
}

/// A stored episode as read back from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Storage-assigned row identifier.
    pub id: i64,
    /// Formatted start time.
    pub start_time: String,
    /// Formatted end time.
    pub end_time: String,
    /// Duration in seconds.
    pub duration: i64,
}

/// Errors reported by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The record cannot be represented by the backend.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Durable store for completed episodes.
#[async_trait::async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Append one completed episode.
    async fn save(&self, record: &EpisodeRecord) -> Result<(), StoreError>;

    /// All stored episodes, newest first.
    async fn history(&self) -> Result<Vec<HistoryEntry>, StoreError>;
}

/// Submit a record on a background task and log the outcome.
///
/// The returned handle is only useful to tests; production callers drop it.
pub fn dispatch(store: Arc<dyn EpisodeStore>, record: EpisodeRecord) -> JoinHandle<()> {
    info!(
        start_time = %record.start_time,
        end_time = %record.end_time,
        duration = record.duration,
        "Attempting to save rain episode"
    );

    tokio::spawn(async move {
        match store.save(&record).await {
            Ok(()) => info!(
                start_time = %record.start_time,
                duration = record.duration,
                "Rain episode saved"
            ),
            Err(e) => error!(
                start_time = %record.start_time,
                end_time = %record.end_time,
                duration = record.duration,
                error = %e,
                "Failed to save rain episode, record dropped"
            ),
        }
    })
}

/// In-memory [`EpisodeStore`] for tests and database-less runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
    failing: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Number of stored episodes.
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_err<T>(e: &std::sync::PoisonError<T>) -> StoreError {
        StoreError::Backend(format!("memory store lock poisoned: {e}"))
    }
}

#[async_trait::async_trait]
impl EpisodeStore for MemoryStore {
    async fn save(&self, record: &EpisodeRecord) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(StoreError::Backend("memory store set to fail".to_owned()));
        }
        let duration = i64::try_from(record.duration)
            .map_err(|e| StoreError::InvalidRecord(format!("duration out of range: {e}")))?;
        let mut entries = self.entries.lock().map_err(|e| Self::lock_err(&e))?;
        let id = i64::try_from(entries.len()).unwrap_or(i64::MAX).saturating_add(1);
        entries.push(HistoryEntry {
            id,
            start_time: record.start_time.clone(),
            end_time: record.end_time.clone(),
            duration,
        });
        Ok(())
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let entries = self.entries.lock().map_err(|e| Self::lock_err(&e))?;
        Ok(entries.iter().rev().cloned().collect())
    }
}
