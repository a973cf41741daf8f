//! `vigild` — the vigil governance daemon.

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigil_engine::{Dispatcher, NotificationSink, TracingSink};
use vigil_gateway::{router, AppState, Config, Stores};
use vigil_storage::{
    Database, MemoryAgentStore, MemoryApprovalStore, MemoryLedgerStore, MemoryPolicyStore,
    SurrealAgentStore, SurrealApprovalStore, SurrealLedgerStore, SurrealPolicyStore,
};

#[derive(Debug, Parser)]
#[command(name = "vigild", about = "Agent spending governance daemon", version)]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 0.0.0.0:8450.
    #[arg(long)]
    listen: Option<String>,

    /// Run with in-memory stores; nothing survives a restart.
    #[arg(long)]
    memory: bool,
}

async fn build_stores(config: &Config, force_memory: bool) -> anyhow::Result<Stores> {
    if force_memory || config.storage.memory {
        tracing::warn!("running with in-memory stores; data will not survive a restart");
        return Ok(Stores {
            agents: Arc::new(MemoryAgentStore::new()),
            policies: Arc::new(MemoryPolicyStore::new()),
            approvals: Arc::new(MemoryApprovalStore::new()),
            ledger: Arc::new(MemoryLedgerStore::new()),
        });
    }

    std::fs::create_dir_all(&config.storage.data_dir).with_context(|| {
        format!(
            "failed to create data directory {}",
            config.storage.data_dir.display()
        )
    })?;
    let path = config.storage.data_dir.join("vigil.db");
    let db = Database::connect_embedded(&path.to_string_lossy())
        .await
        .context("failed to open embedded database")?;
    tracing::info!(path = %path.display(), "embedded database opened");
    Ok(Stores {
        agents: Arc::new(SurrealAgentStore::new(db.clone())),
        policies: Arc::new(SurrealPolicyStore::new(db.clone())),
        approvals: Arc::new(SurrealApprovalStore::new(db.clone())),
        ledger: Arc::new(SurrealLedgerStore::new(db)),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config = config.with_env_overrides();
    if let Some(listen) = args.listen {
        config.gateway.listen_addr = listen;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.filter.clone())),
        )
        .init();

    if config.gateway.ingest_token.is_none() {
        tracing::warn!("no ingest token configured; the ingestion webhook is disabled");
    }
    if config.gateway.admin_token.is_none() {
        tracing::warn!("no admin token configured; decisions and policy writes are disabled");
    }

    let stores = build_stores(&config, args.memory).await?;
    let dispatcher = Arc::new(Dispatcher::new().with_sink(Arc::new(TracingSink) as Arc<dyn NotificationSink>));
    let state = AppState::new(stores, dispatcher)
        .with_ingest_token(config.gateway.ingest_token.clone())
        .with_admin_token(config.gateway.admin_token.clone())
        .with_default_ttl(config.gateway.default_ttl_minutes);

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "vigild listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
