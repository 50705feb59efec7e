use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use history_core::config::Config;
use history_core::http::{self, AppState};
use history_core::observability::{setup_logging, ServiceMetrics};
use history_core::storage::{self, QueryStorage, RetryingStorage};
use history_core::{QueryFetcher, QueryService, SessionManager};

/// Accepts completed-query notifications from query-engine coordinators,
/// fetches the full record back, and serves it by identifier.
#[derive(Debug, Parser)]
#[command(name = "history-server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "history-server.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging();

    let config = Config::load(&args.config).context("loading configuration")?;

    let sessions = Arc::new(SessionManager::new(&config.coordinator)?);
    let fetcher = QueryFetcher::new(&config.coordinator, sessions)?;

    let backend = storage::backend_from_config(&config.storage)?;
    backend
        .ensure_ready()
        .await
        .context("storage backend is not usable")?;
    let retrying = RetryingStorage::new(backend, config.retry.policy());

    let service = Arc::new(QueryService::new(fetcher, retrying));
    let state = AppState {
        service,
        environment: config.server.environment.clone(),
        metrics: Arc::new(ServiceMetrics::new()),
    };

    info!(
        environment = %config.server.environment,
        "starting query history server"
    );
    http::serve(state, config.server.listen_addr).await
}
