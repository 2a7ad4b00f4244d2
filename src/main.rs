use actix_multipart::form::MultipartFormConfig;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use sqlx::{Pool, Postgres};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod api;
mod cli;
mod config;
mod db;
mod display;
mod engine;
mod shutdown;
mod worker;

use crate::api::{health::health_config, job::handlers::job_config, job::JobService, validation};
use crate::cli::{Cli, Command};
use crate::display::DisplaySynchronizer;
use crate::engine::{
    Clock, CompletionFinalizer, CompletionLedger, JobBoard, JobSettings, PayoutOptions, SystemClock,
};
use crate::shutdown::ShutdownCoordinator;
use crate::worker::RolloverWorker;

fn init_logging(log_dir: &str) {
    // Log files are created as: logs/info.log.2024-12-22, logs/error.log.2024-12-22, etc.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(log_dir, "info.log");
    let warn_file = tracing_appender::rolling::daily(log_dir, "warn.log");
    let error_file = tracing_appender::rolling::daily(log_dir, "error.log");
    let debug_file = tracing_appender::rolling::daily(log_dir, "debug.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let warn_layer = tracing_subscriber::fmt::layer()
        .with_writer(warn_file)
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let debug_layer = tracing_subscriber::fmt::layer()
        .with_writer(debug_file)
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .with(debug_layer)
        .init();
}

/// Connect and migrate when a database is configured
async fn connect_ledger(database_url: Option<&str>, max_connections: u32) -> io::Result<Option<Pool<Postgres>>> {
    let Some(url) = database_url else {
        return Ok(None);
    };

    let pool = db::connection::get_connection(url, max_connections)
        .await
        .map_err(|e| io::Error::other(format!("Failed to connect to database: {}", e)))?;

    db::migrations::run_migrations(&pool)
        .await
        .map_err(|e| io::Error::other(format!("Failed to run database migrations: {}", e)))?;

    Ok(Some(pool))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let config = config::Config::from_env().map_err(io::Error::other)?;

    std::fs::create_dir_all(&config.log_dir)?;
    init_logging(&config.log_dir);

    let (bind_address, port) = match cli.command() {
        Command::Migrate => {
            if config.database_url.is_none() {
                return Err(io::Error::other("DATABASE_URL is required to run migrations"));
            }
            connect_ledger(config.database_url.as_deref(), config.max_db_connections).await?;
            return Ok(());
        }
        Command::Serve { bind, port } => (
            bind.unwrap_or_else(|| config.bind_address.clone()),
            port.unwrap_or(config.port),
        ),
    };

    info!("Starting shift-ledger application");
    info!("Configuration loaded successfully:");
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Display refresh: {} ms", config.display_refresh_ms);
    info!("  - Rollover check: {} s", config.rollover_check_secs);

    let pool = connect_ledger(config.database_url.as_deref(), config.max_db_connections).await?;
    let ledger = match &pool {
        Some(pool) => CompletionLedger::postgres(pool.clone()),
        None => {
            warn!("DATABASE_URL not set; completion records are kept in memory");
            CompletionLedger::in_memory()
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let finalizer = CompletionFinalizer::new(
        ledger.clone(),
        PayoutOptions::new(config.payout_destinations.clone()),
    );
    let board = Arc::new(JobBoard::new(finalizer, JobSettings::default()));

    if config.seed_jobs {
        board
            .seed_defaults(clock.now())
            .await
            .map_err(|e| io::Error::other(format!("Failed to seed jobs: {}", e)))?;
    }

    let display = Arc::new(DisplaySynchronizer::new(
        clock.clone(),
        Duration::from_millis(config.display_refresh_ms),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let rollover = RolloverWorker::new(board.clone(), clock.clone(), display.clone());
    let check_interval = Duration::from_secs(config.rollover_check_secs);
    let worker_handles = vec![tokio::spawn(async move {
        rollover.run(check_interval, shutdown_rx).await;
    })];

    let job_service = web::Data::new(JobService::new(board, display.clone(), clock));
    let ledger_data = web::Data::new(ledger);
    let max_payload_size = config.max_payload_size;

    let server = HttpServer::new(move || {
        let payload_config = web::PayloadConfig::default().limit(max_payload_size);
        let multipart_config = MultipartFormConfig::default().total_limit(max_payload_size);

        App::new()
            .app_data(job_service.clone())
            .app_data(ledger_data.clone())
            .app_data(payload_config)
            .app_data(multipart_config)
            .app_data(validation::json_config())
            .configure(health_config)
            .configure(job_config)
    });

    info!("Server starting on http://{}:{}", bind_address, port);

    let server = server.bind((bind_address.as_str(), port))?.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let coordinator = ShutdownCoordinator::new(
        server_handle,
        server_task,
        worker_handles,
        shutdown_tx,
        display,
        pool,
    );

    coordinator.wait_for_shutdown().await
}
