//! Keyward licensing server
//!
//! Serves client auth and heartbeats, accepts payment provider webhooks,
//! and stores crash reports.
//!
//! Usage:
//!   keyward-server --port 8080 --database keyward.db
//!
//! Secrets come from the environment (`STRIPE_API_KEY`,
//! `STRIPE_WEBHOOK_SECRET`); startup fails if either is missing.

use std::{path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::Parser;
use keyward_auth::{AuthGate, HeartbeatTracker, ReleaseCatalog};
use keyward_billing::{HttpNotifyHook, LogHook, Reconciler, StripeCustomerDirectory, WebhookQueue};
use keyward_server::{build_router, AppState, FsCrashSink, ServerConfig};
use keyward_store::EntitlementStore;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "keyward-server")]
#[command(about = "Keyward licensing and update server")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the SQLite entitlement database
    #[arg(short, long, default_value = "keyward.db")]
    database: PathBuf,

    /// Webhook events buffered before deliveries are refused
    #[arg(long, default_value = "256")]
    queue_capacity: usize,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_target(false)
        .compact()
        .init();

    info!("Keyward server starting...");
    let config = ServerConfig::from_env().context("loading configuration")?;

    let store = EntitlementStore::open(&args.database)
        .with_context(|| format!("opening database {}", args.database.display()))?;
    info!(path = %args.database.display(), users = store.user_count()?, "database open");

    let directory = StripeCustomerDirectory::new(
        &config.stripe_api_key,
        &config.stripe_api_base,
        config.provider_timeout,
    )
    .context("building payment provider client")?;

    let mut reconciler = Reconciler::new(
        store.clone(),
        Arc::new(directory),
        &config.stripe_webhook_secret,
    )
    .with_hook(Arc::new(LogHook));
    if let Some(url) = &config.notify_webhook_url {
        let hook = HttpNotifyHook::new(url, config.provider_timeout)
            .context("building notification client")?;
        reconciler = reconciler.with_hook(Arc::new(hook));
        info!("operator notifications enabled");
    }
    let reconciler = Arc::new(reconciler);
    let queue = WebhookQueue::spawn(reconciler.clone(), args.queue_capacity);

    let state = AppState {
        gate: Arc::new(AuthGate::new(
            store.clone(),
            ReleaseCatalog::new(&config.download_base_url),
        )),
        heartbeats: Arc::new(HeartbeatTracker::new(store)),
        reconciler,
        queue: queue.handle(),
        crash_sink: Arc::new(FsCrashSink::new(&config.crash_report_dir)),
    };

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .with_context(|| format!("binding port {}", args.port))?;
    info!("HTTP API listening on port {}", args.port);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("draining webhook queue");
    queue.shutdown().await;
    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal");
}
