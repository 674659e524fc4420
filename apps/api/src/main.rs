mod activity;
mod cache;
mod config;
mod daily;
mod db;
mod errors;
mod interview;
mod llm_client;
mod matching;
mod practice;
mod profile;
mod routes;
mod saved_jobs;
mod state;
mod storage;
mod strategy;

use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "careerflow-api")]
#[command(about = "Career automation API and batch jobs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the HTTP API (default).
    Serve,
    /// Rebuild every user's daily snapshot once and exit.
    RunDaily,
    /// Send the daily digest emails once and exit.
    Notify,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerFlow API v{}", env!("CARGO_PKG_VERSION"));

    // Daily workers plus headroom for HTTP traffic
    let max_connections = (config.daily_job_concurrency as u32 + 6).max(10);
    let db = create_pool(&config.database_url, max_connections).await?;

    // Redis backs the cache and interview sessions; connections open lazily
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let state = AppState::build(config.clone(), db, redis, s3)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve(state, config.port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::RunDaily => {
            let report = state.daily.run_for_all_users().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_total_failure() {
                error!(status = ?report.status, "daily job failed");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Notify => {
            let report = state.notifier.run().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_total_failure() {
                error!(status = ?report.status, "notification run failed");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "careerflow-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
