//! Entry points behind the CLI commands.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use konsul_core::{init_tracing, AuthUser, Role};
use tracing::{error, info, instrument};

use crate::auth::AuthGateway;
use crate::components::build_components;
use crate::config::ServerConfig;
use crate::routes;

/// Main entry: validate config, init logging, build components, start the scheduler loop and
/// serve until Ctrl-C.
#[instrument(skip(config))]
pub async fn run_server(config: ServerConfig) -> Result<()> {
    config.validate()?;
    init_tracing(&config.log_file, config.log_format)?;

    info!(
        bind_addr = %config.bind_addr,
        database_url = %config.database_url,
        "Initializing server"
    );

    let components = build_components(&config).await?;
    let scheduler = components.scheduler.clone();
    let scheduler_task = tokio::spawn(scheduler.run(components.accepted_rx));

    let app = routes::build(components.state);
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    scheduler_task.abort();
    info!("Server stopped");
    Ok(())
}

/// One auto-message sweep, then exit.
#[instrument(skip(config))]
pub async fn run_tick(config: ServerConfig) -> Result<()> {
    config.validate()?;
    init_tracing(&config.log_file, config.log_format)?;

    let components = build_components(&config).await?;
    let report = components.scheduler.tick(Utc::now()).await?;
    info!(?report, "Auto-message sweep finished");
    println!(
        "examined={} sent={} not_due={} skipped={} failed={}",
        report.examined, report.sent, report.not_due, report.skipped, report.failed
    );
    Ok(())
}

pub fn issue_token(config: &ServerConfig, id: &str, role: &str, ttl_hours: i64) -> Result<String> {
    let role: Role = role.parse()?;
    let token = AuthGateway::new(&config.jwt_secret)
        .issue(&AuthUser::new(id, role), Duration::hours(ttl_hours))?;
    Ok(token)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
