//! Rainwatch server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from the environment
//! 3. Configure the `PostgreSQL` pool and validate `rain_history`
//! 4. Create the episode tracker
//! 5. Serve until `Ctrl-C` / `SIGTERM`

use std::sync::Arc;

use rainwatch_core::{EpisodeStore, EpisodeTracker, SystemClock};
use rainwatch_db::{PgEpisodeStore, PostgresConfig, PostgresPool};
use rainwatch_server::{AppState, ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    init_tracing();
    info!("rainwatch starting");

    // 2. Load configuration.
    let config = ServerConfig::from_env()?;
    info!(
        host = %config.host,
        port = config.port,
        tick_interval = ?config.tick_interval,
        "Configuration loaded"
    );

    // 3. Storage. A missing table only degrades history, never live state.
    let pool = PostgresPool::connect_lazy(
        &PostgresConfig::new(&config.database_url).with_max_connections(config.db_max_connections),
    )?;
    let store = PgEpisodeStore::new(pool.clone());
    store.validate().await;
    let store: Arc<dyn EpisodeStore> = Arc::new(store);

    // 4. Tracker.
    let tracker = EpisodeTracker::new(
        Arc::new(SystemClock),
        Arc::clone(&store),
        config.tick_interval,
    );
    let state = Arc::new(AppState::new(tracker, store));

    // 5. Serve.
    start_server(&config, state).await?;
    pool.close().await;
    Ok(())
}

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
