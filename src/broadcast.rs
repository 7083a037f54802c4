use crate::state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interval between session timer sweeps
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn a background task that expires overdue session items, submits
/// completions produced by timers, and evicts idle sessions.
pub fn spawn_session_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;

            let now = Instant::now();
            let submitted = state.tick_sessions(now).await;
            if submitted > 0 {
                tracing::debug!(submitted, "Sweeper submitted completions");
            }
            state.evict_idle_sessions(now).await;
        }
    });
}

/// Spawn a background task that periodically writes the store to `path`.
pub fn spawn_snapshot_writer(state: Arc<AppState>, path: PathBuf) {
    let interval = state.config.snapshot_interval;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            if let Err(e) = state.save_snapshot(&path).await {
                tracing::error!("Failed to write snapshot to {}: {}", path.display(), e);
            }
        }
    });
}
