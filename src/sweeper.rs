//! Hourly session sweeper.
//!
//! Expired paused sessions transition to abandoned and are evicted from the
//! in-memory cache. Abandoned sessions older than 48 hours are evicted from
//! cache only — their rows are an audit artifact and are never deleted from
//! durable storage.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::engine::ConversationEngine;
use crate::storage::Storage;

const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// Background sweeper loop. Call this in a `tokio::spawn` during startup.
pub async fn run(engine: Arc<ConversationEngine>, storage: Arc<Storage>) {
    info!("session sweeper started (hourly)");
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    // The first tick fires immediately. Startup recovery itself runs
    // synchronously before the listener binds; see Storage::recover_stale_sessions.
    loop {
        interval.tick().await;
        match engine.sweep(Utc::now()).await {
            Ok(swept) if swept > 0 => {
                info!(swept, "sweeper transitioned expired paused sessions")
            }
            Ok(_) => {}
            Err(e) => warn!(err = %e, "sweeper pass failed"),
        }
        match storage.session_stats().await {
            Ok(stats) => info!(?stats, "session stats"),
            Err(e) => warn!(err = %e, "failed to read session stats"),
        }
    }
}
