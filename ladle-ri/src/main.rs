//! ladle-ri - Recipe Ingest Service
//!
//! Service startup: configuration resolution, database initialization, worker
//! pool spawn, HTTP serve with graceful shutdown.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ladle_common::config::{ensure_data_dir, load_toml_config, resolve_data_dir, ImportConfig};
use ladle_common::events::EventBus;
use ladle_ri::broadcast::StatusBroadcaster;
use ladle_ri::pipeline::runner::{RetryPolicy, StageRunner};
use ladle_ri::pipeline::worker::WorkerPool;
use ladle_ri::pipeline::StageDeps;
use ladle_ri::queue::MemoryQueue;
use ladle_ri::stages::default_stages;
use ladle_ri::store::SqliteNoteStore;
use ladle_ri::AppState;

#[derive(Parser, Debug)]
#[command(name = "ladle-ri", about = "Ladle recipe ingest service")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "LADLE_RI_PORT", default_value_t = 5727)]
    port: u16,

    /// Data directory holding the SQLite database
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_toml_config()?;

    // RUST_LOG wins; the config file provides the default filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting ladle-ri (Recipe Ingest) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve data directory and open the database
    let data_dir = resolve_data_dir(args.data_dir.as_deref(), &toml_config);
    let db_path = ensure_data_dir(&data_dir)?;
    info!("Database: {}", db_path.display());
    let db_pool = ladle_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Event bus and status broadcasting
    let event_bus = EventBus::new(1000);
    let broadcaster = StatusBroadcaster::new(event_bus);

    // Pipeline wiring: store, stages, runner, worker pool
    let import_config = ImportConfig::resolve(&toml_config);
    info!(
        concurrency = import_config.concurrency,
        job_timeout_ms = import_config.job_timeout_ms,
        max_retries = import_config.max_retries,
        "Import configuration resolved"
    );

    let store = Arc::new(SqliteNoteStore::new(db_pool.clone()));
    let deps = StageDeps {
        store,
        broadcaster: Some(broadcaster.clone()),
    };
    let runner = Arc::new(StageRunner::new(
        default_stages(),
        deps,
        RetryPolicy::from_config(&import_config),
    ));

    let queue = Arc::new(MemoryQueue::new(256));
    let shutdown = CancellationToken::new();
    let pool = WorkerPool::spawn(
        queue.clone(),
        runner,
        broadcaster.clone(),
        &import_config,
        shutdown.clone(),
    );
    info!(workers = import_config.concurrency, "Import workers started");

    // HTTP surface
    let state = AppState::new(db_pool, queue, broadcaster);
    let app = ladle_ri::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("Listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await?;

    // Let in-flight imports finish before exit
    pool.shutdown().await;
    info!("ladle-ri stopped");

    Ok(())
}
