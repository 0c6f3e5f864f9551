//! Periodic purge of expired sessions

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::manager::SandboxManager;
use crate::infrastructure::observability::{record_session_event, set_active_sessions};

/// Spawn a task that purges expired sessions every `interval`.
///
/// The task runs until aborted through the returned handle.
pub fn spawn_purge_task(manager: Arc<Mutex<SandboxManager>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let mut manager = manager.lock().await;
            let purged = manager.purge_expired_sessions(Utc::now());

            if purged > 0 {
                record_session_event("purged", purged as u64);
            }
            set_active_sessions(manager.active_count());
        }
    })
}
