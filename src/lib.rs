pub mod config;
pub mod enforcement;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod report;
pub mod rest;
pub mod risk;
pub mod screeners;
pub mod session;
pub mod storage;
pub mod sweeper;

use std::sync::Arc;

use config::{DaemonConfig, HotConfig};
use engine::ConversationEngine;
use rest::rate_limit::RateLimiter;
use storage::Storage;

/// Shared application state passed to every HTTP handler and background task.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub storage: Arc<Storage>,
    pub engine: Arc<ConversationEngine>,
    /// Hot-reloadable config subset (log level, enforcement thresholds).
    pub hot: Arc<tokio::sync::RwLock<HotConfig>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: std::time::Instant,
}
