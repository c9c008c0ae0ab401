use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use intaked::{
    config::{ConfigWatcher, DaemonConfig, HotConfig},
    engine::ConversationEngine,
    gateway::OpenAiGateway,
    report::TextRenderer,
    rest,
    rest::rate_limit::RateLimiter,
    risk::escalation::LoggingSink,
    storage::Storage,
    sweeper, AppContext,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "intaked",
    about = "Intake Host — always-on psychiatric intake conversation daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port
    #[arg(long, env = "INTAKED_PORT")]
    port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "INTAKED_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "INTAKED_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "INTAKED_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon server (default when no subcommand given).
    Serve,
    /// Register an admin user to receive risk escalations.
    ///
    /// Examples:
    ///   intaked seed-admin --email oncall@clinic.example --name "On Call"
    SeedAdmin {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

fn init_tracing(filter: &str, log_file: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file = path.file_name().map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "intaked.log".to_string());
            let appender = tracing_appender::rolling::daily(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Arc::new(DaemonConfig::new(args.port, args.data_dir, args.log));
    let _log_guard = init_tracing(&config.log, args.log_file.as_deref());

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::SeedAdmin { email, name } => {
            let storage = Storage::new(&config.data_dir)
                .await
                .context("failed to open database")?;
            let id = storage
                .insert_admin(&email, &name)
                .await
                .context("failed to insert admin")?;
            println!("admin registered: {email} ({id})");
            Ok(())
        }
    }
}

async fn serve(config: Arc<DaemonConfig>) -> Result<()> {
    info!(data_dir = %config.data_dir.display(), "intaked starting");

    let storage = Arc::new(
        Storage::new(&config.data_dir)
            .await
            .context("failed to open database")?,
    );

    // Settle sessions a previous process left behind before accepting any
    // traffic: expired pauses become abandoned now, not at the first sweep.
    let recovered = storage
        .recover_stale_sessions(chrono::Utc::now())
        .await
        .context("startup session recovery failed")?;
    if recovered > 0 {
        info!(recovered, "recovered stale sessions at startup");
    }

    // Hot-reloadable threshold config; falls back to startup values when the
    // watcher cannot run. The watcher handle must outlive the server.
    let (hot, _config_watcher) = match ConfigWatcher::start(&config.data_dir) {
        Some(watcher) => (watcher.hot.clone(), Some(watcher)),
        None => (
            Arc::new(tokio::sync::RwLock::new(HotConfig {
                log_level: config.log.clone(),
                thresholds: config.thresholds,
            })),
            None,
        ),
    };

    let gateway = Arc::new(OpenAiGateway::new(
        &config.llm_base_url,
        &config.llm_api_key,
        &config.llm_model,
        config.llm_max_tokens,
    ));

    let engine = ConversationEngine::new(
        storage.clone(),
        gateway,
        Arc::new(LoggingSink),
        Arc::new(TextRenderer),
        hot.clone(),
    );

    tokio::spawn(sweeper::run(engine.clone(), storage.clone()));

    let ctx = Arc::new(AppContext {
        config,
        storage,
        engine,
        hot,
        rate_limiter: Arc::new(RateLimiter::new()),
        started_at: std::time::Instant::now(),
    });

    rest::serve(ctx).await
}
