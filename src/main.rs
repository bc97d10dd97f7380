//! status-gateway
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ routing::Gateway ──▶ http::response ──▶ Upstream app
//!                                   │      │     │
//!                         security  │ cache│     │ resilience::AdmissionGate
//!                       rate limit ◀┘      ▼     ▼
//!                                   TenantCache  store (tenants, API keys, sessions)
//!
//!     admin listener ──▶ cache / limiter / gate stats
//!     lifecycle      ──▶ signals, shutdown, maintenance sweeps
//!     config watcher ──▶ routing rules hot swap
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use tokio::net::TcpListener;

use status_gateway::admin::{setup_admin_router, AdminState};
use status_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use status_gateway::lifecycle::{wait_for_signal, Maintenance, Shutdown};
use status_gateway::observability::{logging, metrics};
use status_gateway::routing::{Gateway, Stores};
use status_gateway::store::MemoryStore;
use status_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "status-gateway", version, about = "Edge gateway for multi-tenant status pages")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability);

    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        root_domain = %config.routing.root_domain,
        "status-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = match &config.store.seed_path {
        Some(path) => MemoryStore::load_from_file(Path::new(path))?,
        None => {
            tracing::warn!("No store seed configured; every tenant resolves as unknown");
            MemoryStore::new()
        }
    };

    let gateway = Arc::new(Gateway::new(&config, Stores::memory(store)));
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    // Routing rules follow the config file; sizing stays as started.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, config.routing.clone());
            let reload_gateway = gateway.clone();
            tokio::spawn(async move {
                while let Some(routing) = updates.recv().await {
                    tracing::info!(root_domain = %routing.root_domain, "Routing rules reloaded");
                    reload_gateway.update_routing(routing);
                }
            });
            match watcher.run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable; hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    tokio::spawn(
        Maintenance::new(
            gateway.cache().clone(),
            gateway.limiter().clone(),
            Duration::from_secs(config.cache.sweep_interval_secs),
            Duration::from_secs(config.rate_limit.sweep_interval_secs),
        )
        .run(shutdown.subscribe()),
    );

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(AdminState::new(gateway.clone(), &config.admin.api_key));
        let mut admin_shutdown = shutdown.subscribe();
        Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await
        }))
    } else {
        None
    };

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal(&signal_shutdown).await;
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::with_gateway(&config, gateway)?;
    server.run(listener, server_shutdown).await?;

    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
