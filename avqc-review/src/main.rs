//! avqc-review - digitized AV quality-control queue
//!
//! Periodic tasks (run from cron) and the HTTP service the review UI calls.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use avqc_common::config::resolve_config_path;
use avqc_common::Config;
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avqc_review::commands;
use avqc_review::db::init_database;
use avqc_review::services::{
    AquilaClient, ArchivesSpaceClient, DiscoveryProcess, FfprobeProbe, LifecycleController,
    Notifier, SnsNotificationBus,
};
use avqc_review::AppState;

#[derive(Parser, Debug)]
#[command(name = "avqc-review")]
#[command(about = "Quality-control queue for digitized audio/video packages")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $AVQC_CONFIG, then the user and system config dirs)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Create records for new packages in the storage root
    DiscoverPackages,
    /// Send a completion message if nothing is left to review
    CheckQcStatus,
    /// Mirror new rights statements from the rights registry
    FetchRightsStatements,
    /// Announce that packages are waiting for review
    SendStartupMessage,
    /// Serve the review API
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = resolve_config_path(cli.config.as_deref())
        .and_then(|path| Config::load(&path).map(|config| (path, config)));
    let (config_path, config) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("avqc-review: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging.level);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_timestamp = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting avqc-review"
    );
    info!("Config: {}", config_path.display());

    match run(cli.command, Arc::new(config)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins over the configured level
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(command: Command, config: Arc<Config>) -> Result<()> {
    config.require_storage_root()?;

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;

    match command {
        Command::DiscoverPackages => {
            let lookup = Arc::new(ArchivesSpaceClient::new(&config.archivesspace)?);
            let probe = Arc::new(FfprobeProbe::new(&config.probe));
            let notifier = build_notifier(&config).await;
            let discovery = DiscoveryProcess::new(pool, config.clone(), lookup, probe, notifier);
            info!("{}", commands::discover_packages(&discovery).await?);
        }
        Command::CheckQcStatus => {
            let notifier = build_notifier(&config).await;
            info!("{}", commands::check_status(&config, &notifier).await?);
        }
        Command::FetchRightsStatements => {
            let registry = AquilaClient::new(&config.aquila)?;
            info!(
                "{}",
                commands::fetch_rights_statements(&config, &pool, &registry).await?
            );
        }
        Command::SendStartupMessage => {
            let notifier = build_notifier(&config).await;
            info!("{}", commands::startup_message(&config, &notifier).await?);
        }
        Command::Serve => serve(pool, config).await?,
    }

    Ok(())
}

async fn build_notifier(config: &Config) -> Notifier {
    let bus = SnsNotificationBus::from_config(&config.notifications).await;
    Notifier::new(Arc::new(bus), &config.notifications)
}

async fn serve(pool: SqlitePool, config: Arc<Config>) -> Result<()> {
    let lookup = Arc::new(ArchivesSpaceClient::new(&config.archivesspace)?);
    let notifier = build_notifier(&config).await;
    let controller = LifecycleController::new(pool.clone(), config.clone(), lookup, notifier);

    let app = avqc_review::build_router(AppState::new(pool, config.clone(), controller));

    let listener = tokio::net::TcpListener::bind(&config.http.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.http.bind))?;
    info!("Listening on http://{}", config.http.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
