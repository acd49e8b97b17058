// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Change relay daemon.
//!
//! Usage:
//!   # Relay with a config file
//!   change-relay --config relay.yaml
//!
//!   # Override the log filter (RUST_LOG still wins when set)
//!   change-relay --config relay.yaml --log-level debug
//!
//!   # Run a single cycle and exit
//!   change-relay --config relay.yaml --once

use anyhow::Context;
use change_relay::broker::{Broker, NoOpBroker};
use change_relay::config::{BrokerKind, RelayConfig};
use change_relay::store::SqliteRecordStore;
use change_relay::RelayEngine;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "change-relay", version, about = "Republish changed records as domain events")]
struct Cli {
    /// Path to a YAML or JSON config file
    #[arg(short, long)]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset (overrides logging.level)
    #[arg(long)]
    log_level: Option<String>,

    /// Run one cycle, print the report and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = RelayConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    init_tracing(&config, cli.log_level.as_deref());

    let store = Arc::new(
        SqliteRecordStore::new(&config.store.sqlite_path, config.store.max_connections)
            .await
            .context("Failed to open record store")?,
    );

    let result = match config.broker.kind {
        BrokerKind::Noop => run(config, Arc::clone(&store), Arc::new(NoOpBroker::new()), cli.once).await,
        #[cfg(feature = "sns")]
        BrokerKind::Sns => {
            let broker = change_relay::sns::SnsBroker::from_env(config.broker.region.clone()).await;
            run(config, Arc::clone(&store), Arc::new(broker), cli.once).await
        }
        #[cfg(not(feature = "sns"))]
        BrokerKind::Sns => Err(anyhow::anyhow!(
            "broker.kind is \"sns\" but this binary was built without the `sns` feature"
        )),
    };

    store.close().await;
    tracing::info!("Goodbye!");
    result
}

fn init_tracing(config: &RelayConfig, cli_level: Option<&str>) {
    let fallback = cli_level.unwrap_or(&config.logging.level).to_string();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run<B: Broker>(
    config: RelayConfig,
    store: Arc<SqliteRecordStore>,
    broker: Arc<B>,
    once: bool,
) -> anyhow::Result<()> {
    let mut engine = RelayEngine::new(config, store, broker);

    if once {
        let report = engine.run_once().await?;
        tracing::info!(
            fetched = report.fetched,
            attempted = report.attempted,
            confirmed = report.confirmed,
            errors = report.errors(),
            watermark = %report.watermark,
            "Single cycle finished"
        );
        for failure in &report.failures {
            tracing::warn!(chunk = failure.chunk, error = %failure.error, "Undelivered change event");
        }
        return Ok(());
    }

    engine.start().await?;

    wait_for_shutdown_signal().await;
    tracing::info!("Shutdown signal received, initiating graceful shutdown...");

    engine.shutdown().await;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
