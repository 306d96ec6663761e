//! # Geotally Node
//!
//! Runs worker, reducer and request-intake loops against the Postgres
//! backends (pgmq queues, job table, tweet table) until Ctrl-C.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use geotally::config::{ConfigManager, GeotallyConfig};
use geotally::intake::RequestProcessor;
use geotally::logging::init_structured_logging;
use geotally::messaging::{
    MessagingService, PgmqMessagingService, RequestQueue, ResultQueue, TaskQueue,
};
use geotally::orchestration::{Orchestrator, Reducer};
use geotally::processing::{run_until_cancelled, ItemProcessor};
use geotally::source::PostgresTweetSource;
use geotally::store::{JobStore, PostgresJobStore};
use geotally::worker::{CountTweetsHandler, TaskHandlerRegistry, Worker};

#[derive(Parser)]
#[command(name = "geotally-node")]
#[command(about = "Run geotally processing loops")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: $GEOTALLY_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment name; overrides GEOTALLY_ENV
    #[arg(short, long)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Compute sub-area tasks
    Worker,
    /// Fold results into jobs
    Reducer,
    /// Turn queued requests into jobs and tasks
    Intake,
    /// Run every loop in this process
    All,
}

impl Commands {
    fn runs(self, role: Commands) -> bool {
        self == Commands::All || self == role
    }
}

struct Backends {
    messaging: Arc<dyn MessagingService>,
    store: Arc<dyn JobStore>,
    pool: PgPool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    let manager = match cli.environment.as_deref() {
        Some(environment) => {
            ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment)
        }
        None => ConfigManager::load_from_directory(cli.config_dir.clone()),
    }
    .context("failed to load configuration")?;
    let config = manager.config().clone();

    let backends = connect(&config).await?;
    let cancel = CancellationToken::new();
    let mut loops = JoinSet::new();

    for processor in build_processors(cli.command, &config, &backends)? {
        let token = cancel.clone();
        let backoff = config.polling.loop_backoff();
        loops.spawn(async move { run_until_cancelled(processor.as_ref(), &token, backoff).await });
    }
    info!(loops = loops.len(), environment = manager.environment(), "geotally node running");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Shutdown requested, finishing in-progress items");
    cancel.cancel();

    while let Some(joined) = loops.join_next().await {
        match joined {
            Ok(stats) => info!(
                processed = stats.processed,
                failures = stats.failures,
                "Loop exited"
            ),
            Err(e) => error!(error = %e, "Loop task panicked"),
        }
    }
    Ok(())
}

async fn connect(config: &GeotallyConfig) -> Result<Backends> {
    let url = config
        .database
        .resolved_url()
        .context("no database URL: set database.url or DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&url)
        .await
        .context("failed to connect to postgres")?;

    let messaging: Arc<dyn MessagingService> =
        Arc::new(PgmqMessagingService::new_with_pool(pool.clone()));
    let queue_names: Vec<String> = config
        .messaging
        .queue_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    messaging
        .ensure_queues(&queue_names)
        .await
        .context("failed to create queues")?;
    messaging
        .check_ready(&queue_names)
        .await
        .context("messaging transport is not ready")?;

    let store = PostgresJobStore::new(pool.clone());
    store.migrate().await.context("failed to migrate job table")?;

    Ok(Backends {
        messaging,
        store: Arc::new(store),
        pool,
    })
}

/// One processor per configured loop. Each gets its own queue handles so
/// in-flight tables are never shared between loops.
fn build_processors(
    command: Commands,
    config: &GeotallyConfig,
    backends: &Backends,
) -> Result<Vec<Arc<dyn ItemProcessor>>> {
    let messaging = &config.messaging;
    let visibility = messaging.visibility_timeout();
    let task_queue = || {
        Arc::new(TaskQueue::new(
            backends.messaging.clone(),
            messaging.task_queue.as_str(),
            visibility,
        ))
    };
    let result_queue = || {
        Arc::new(ResultQueue::new(
            backends.messaging.clone(),
            messaging.result_queue.as_str(),
            visibility,
        ))
    };

    let mut processors: Vec<Arc<dyn ItemProcessor>> = Vec::new();

    if command.runs(Commands::Worker) {
        let source = Arc::new(PostgresTweetSource::new(backends.pool.clone()));
        let mut counter = CountTweetsHandler::new(source);
        if let Some(secs) = config.worker.tweet_max_age_seconds {
            let max_age = chrono::Duration::try_seconds(secs as i64)
                .context("worker.tweet_max_age_seconds is out of range")?;
            counter = counter.with_max_age(max_age);
        }
        let mut handlers = TaskHandlerRegistry::new();
        handlers.register(Arc::new(counter));

        for _ in 0..config.worker.workers {
            processors.push(Arc::new(Worker::new(
                task_queue(),
                result_queue(),
                handlers.clone(),
            )));
        }
    }

    if command.runs(Commands::Reducer) {
        for _ in 0..config.worker.reducers {
            processors.push(Arc::new(Reducer::new(
                result_queue(),
                backends.store.clone(),
            )));
        }
    }

    if command.runs(Commands::Intake) {
        for _ in 0..config.worker.request_processors {
            let orchestrator = Arc::new(Orchestrator::new(backends.store.clone(), task_queue()));
            let requests = Arc::new(RequestQueue::new(
                backends.messaging.clone(),
                messaging.request_queue.as_str(),
                visibility,
            ));
            processors.push(Arc::new(RequestProcessor::new(
                requests,
                backends.store.clone(),
                orchestrator,
            )));
        }
    }

    Ok(processors)
}
