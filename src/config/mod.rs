use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const DEFAULT_PORT: u16 = 4500;
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o";
const DEFAULT_LLM_MAX_TOKENS: u32 = 1024;
const DEFAULT_MIN_HISTORY: usize = 25;
const DEFAULT_MIN_SYMPTOM_DOMAINS: usize = 5;

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port (default: 4500).
    port: Option<u16>,
    /// Log level filter string, e.g. "debug", "info,intaked=trace" (default: "info").
    log: Option<String>,
    /// OpenAI-compatible API base URL (default: https://api.openai.com/v1).
    llm_base_url: Option<String>,
    /// Model identifier sent to the provider.
    llm_model: Option<String>,
    /// Max tokens per assistant turn.
    llm_max_tokens: Option<u32>,
    /// Enforcement gate: minimum conversation turns before screeners.
    min_history_for_screeners: Option<usize>,
    /// Enforcement gate: minimum flagged symptom domains before screeners.
    min_symptom_domains: Option<usize>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// OpenAI-compatible provider endpoint.
    pub llm_base_url: String,
    /// API key (INTAKED_LLM_API_KEY env var). Empty means unauthenticated
    /// local provider (e.g. a llama.cpp / Ollama compatibility endpoint).
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    /// Screener enforcement thresholds (also hot-reloadable, see [`HotConfig`]).
    pub thresholds: EnforcementThresholds,
}

/// The clinical gate that decides when mandatory screeners begin.
///
/// These values encode the requirement that standardized instruments follow a
/// comprehensive symptom interview. They are configuration, not code:
/// clinical owners tune them without a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcementThresholds {
    /// Minimum entries in `conversation_history` before enforcement.
    pub min_history: usize,
    /// Minimum symptom domains flagged true before enforcement.
    pub min_symptom_domains: usize,
}

impl Default for EnforcementThresholds {
    fn default() -> Self {
        Self {
            min_history: DEFAULT_MIN_HISTORY,
            min_symptom_domains: DEFAULT_MIN_SYMPTOM_DOMAINS,
        }
    }
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(port: Option<u16>, data_dir: Option<PathBuf>, log: Option<String>) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let llm_base_url = std::env::var("INTAKED_LLM_BASE_URL")
            .ok()
            .or(toml.llm_base_url)
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());

        let llm_api_key = std::env::var("INTAKED_LLM_API_KEY").unwrap_or_default();

        let llm_model = std::env::var("INTAKED_LLM_MODEL")
            .ok()
            .or(toml.llm_model)
            .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());

        let llm_max_tokens = toml.llm_max_tokens.unwrap_or(DEFAULT_LLM_MAX_TOKENS);

        let thresholds = EnforcementThresholds {
            min_history: toml
                .min_history_for_screeners
                .unwrap_or(DEFAULT_MIN_HISTORY),
            min_symptom_domains: toml
                .min_symptom_domains
                .unwrap_or(DEFAULT_MIN_SYMPTOM_DOMAINS),
        };

        Self {
            port,
            data_dir,
            log,
            llm_base_url,
            llm_api_key,
            llm_model,
            llm_max_tokens,
            thresholds,
        }
    }
}

// ─── Hot-reloadable config subset ─────────────────────────────────────────────

/// Non-critical config fields that can be changed without restarting the daemon.
#[derive(Debug, Clone)]
pub struct HotConfig {
    pub log_level: String,
    pub thresholds: EnforcementThresholds,
}

/// Watches `config.toml` for changes and reloads non-critical fields.
///
/// The watcher uses the `notify` crate (kqueue on macOS, inotify on Linux)
/// to detect file modifications. Only the log level and the enforcement
/// thresholds are reloaded; port and provider settings require a restart.
pub struct ConfigWatcher {
    pub hot: Arc<RwLock<HotConfig>>,
    // Hold the watcher alive; dropping it stops the file watch.
    _watcher: notify_debouncer_full::Debouncer<
        notify_debouncer_full::notify::RecommendedWatcher,
        notify_debouncer_full::FileIdMap,
    >,
}

impl ConfigWatcher {
    /// Start watching `{data_dir}/config.toml` for changes.
    ///
    /// Returns `None` if the watcher could not be created (non-fatal; the
    /// daemon runs fine without hot-reload).
    pub fn start(data_dir: &Path) -> Option<Self> {
        let config_path = data_dir.join("config.toml");
        let initial = load_hot_config(&config_path);
        let hot = Arc::new(RwLock::new(initial));

        let hot_clone = hot.clone();
        let config_path_clone = config_path.clone();
        let rt_handle = tokio::runtime::Handle::current();

        let watcher = notify_debouncer_full::new_debouncer(
            std::time::Duration::from_secs(2),
            None,
            move |result: notify_debouncer_full::DebounceEventResult| {
                if let Ok(events) = result {
                    // Only act on modify/create events
                    let relevant = events.iter().any(|e| {
                        use notify_debouncer_full::notify::EventKind;
                        matches!(e.event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    });
                    if relevant {
                        let hot = hot_clone.clone();
                        let path = config_path_clone.clone();
                        rt_handle.spawn(async move {
                            let new_config = load_hot_config(&path);
                            let mut guard = hot.write().await;
                            if guard.log_level != new_config.log_level
                                || guard.thresholds != new_config.thresholds
                            {
                                info!(
                                    log_level = %new_config.log_level,
                                    min_history = new_config.thresholds.min_history,
                                    min_domains = new_config.thresholds.min_symptom_domains,
                                    "config.toml reloaded"
                                );
                                *guard = new_config;
                            }
                        });
                    }
                }
            },
        );

        match watcher {
            Ok(mut debouncer) => {
                use notify_debouncer_full::notify::Watcher as _;
                // Watch the data_dir (parent of config.toml) since watching a
                // non-existent file fails on some platforms.
                let watch_path = config_path.parent().unwrap_or_else(|| Path::new("."));
                if let Err(e) = debouncer.watcher().watch(
                    watch_path,
                    notify_debouncer_full::notify::RecursiveMode::NonRecursive,
                ) {
                    warn!("config watcher failed to start: {e} — hot-reload disabled");
                    return None;
                }
                info!(path = %config_path.display(), "config hot-reload watcher started");
                Some(Self {
                    hot,
                    _watcher: debouncer,
                })
            }
            Err(e) => {
                warn!("config watcher creation failed: {e} — hot-reload disabled");
                None
            }
        }
    }
}

/// Load only the hot-reloadable fields from config.toml.
fn load_hot_config(path: &Path) -> HotConfig {
    let toml = std::fs::read_to_string(path)
        .ok()
        .and_then(|s| toml::from_str::<TomlConfig>(&s).ok())
        .unwrap_or_default();
    HotConfig {
        log_level: toml.log.unwrap_or_else(|| "info".to_string()),
        thresholds: EnforcementThresholds {
            min_history: toml
                .min_history_for_screeners
                .unwrap_or(DEFAULT_MIN_HISTORY),
            min_symptom_domains: toml
                .min_symptom_domains
                .unwrap_or(DEFAULT_MIN_SYMPTOM_DOMAINS),
        },
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/intaked
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("intaked");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/intaked or ~/.local/share/intaked
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("intaked");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("intaked");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\intaked
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("intaked");
        }
    }
    // Fallback
    PathBuf::from(".intaked")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_toml() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DaemonConfig::new(None, Some(dir.path().to_path_buf()), None);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.thresholds.min_history, 25);
        assert_eq!(cfg.thresholds.min_symptom_domains, 5);
    }

    #[test]
    fn cli_overrides_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "port = 9000\nmin_history_for_screeners = 10\n",
        )
        .unwrap();
        let cfg = DaemonConfig::new(Some(4501), Some(dir.path().to_path_buf()), None);
        assert_eq!(cfg.port, 4501);
        assert_eq!(cfg.thresholds.min_history, 10);
    }
}
