//! Vitals Server - Main entry point
//!
//! Serves the aggregated health endpoint and Prometheus metrics.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;

use vitals_core::{
    config::Config,
    health::{
        self, DatabasePingProbe, HealthChecker, LoggingListener, ProbeDefinition, TaskCountProbe,
    },
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config_path = std::env::var_os("VITALS_CONFIG").map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    telemetry::init_logging(&config.observability.logging())?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Vitals Server"
    );

    // Connect lazily so a database outage shows up as a failing probe
    // instead of a startup error.
    let pool = match &config.database.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_secs(2))
                .connect_lazy(url)?;
            tracing::info!("Database pool created");
            Some(pool)
        }
        None => None,
    };

    let mut probes = Vec::new();
    if config.health.task_threshold > 0 {
        probes.push(ProbeDefinition::new(
            "tasks",
            TaskCountProbe::new(config.health.task_threshold),
        ));
    }
    if let Some(pool) = &pool {
        probes.push(ProbeDefinition::new("database", DatabasePingProbe::new(pool.clone())));
    }
    for spec in &config.health.probes {
        probes.push(spec.build(pool.as_ref())?);
    }

    let checker = HealthChecker::builder()
        .with_config(config.health.timing())
        .with_probes(probes)
        .with_listener(LoggingListener)
        .build()?;

    // Build router
    let mut app = health::health_router(checker, &config.health.path);
    if config.observability.metrics_enabled {
        let handle = telemetry::init_metrics()?;
        app = app.merge(telemetry::metrics_router(handle));
    }
    let app = app.layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(address = %addr, path = %config.health.path, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
