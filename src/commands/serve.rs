//! Server command handler
//!
//! Startup order:
//! 1. Open the version store (creates the layout, removes stale temp links)
//!    and take its owner lock for the lifetime of the server
//! 2. Run the retention sweep once, before any push command is accepted
//! 3. Start the reservation watchdog if a timeout is configured
//! 4. Serve HTTP until Ctrl-C

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::WallmountConfig;
use crate::controller::PushController;
use crate::error::{Result, WallmountError};
use crate::http::{router, AppState};
use crate::page::PageOptions;
use crate::store::VersionStore;
use crate::watchdog::{ReservationWatchdog, WatchdogConfig};

/// Run the HTTP server
///
/// This creates a tokio runtime and blocks until the server shuts down.
pub fn run_serve(config: &WallmountConfig) -> Result<String> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| WallmountError::ConfigError {
        message: format!("Failed to create tokio runtime: {}", e),
    })?;

    runtime
        .block_on(async { run_serve_async(config).await })
        .map_err(|e| match e.downcast::<WallmountError>() {
            Ok(err) => err,
            Err(other) => WallmountError::ConfigError {
                message: other.to_string(),
            },
        })?;

    Ok(String::new())
}

/// Open the store and build a controller ready to accept push commands.
///
/// The startup sweep runs here. An unreadable live pointer is fatal; any
/// other sweep problem has already been logged by the sweeper.
pub fn bootstrap(config: &WallmountConfig) -> Result<Arc<PushController>> {
    let store = VersionStore::open(&config.storage.root_dir)?;
    tracing::info!(root = %store.root().display(), "Opened version store");

    let controller = PushController::new(store)?
        .with_reservation_timeout(config.push.reservation_timeout());

    let report = controller.sweep()?;
    match &report.live {
        Some(live) => tracing::info!(
            op = "startup.sweep",
            live = %live,
            deleted = report.deleted.len(),
            "Startup sweep complete"
        ),
        None => tracing::info!(op = "startup.sweep", "No live version yet"),
    }

    Ok(Arc::new(controller))
}

async fn run_serve_async(config: &WallmountConfig) -> anyhow::Result<()> {
    tracing::info!("Starting wallmountd v{}", env!("CARGO_PKG_VERSION"));

    let controller = bootstrap(config)?;

    let watchdog = ReservationWatchdog::new(WatchdogConfig {
        interval: config.push.watchdog_interval(),
    });
    let _watchdog_handle = watchdog.start(Arc::clone(&controller));

    let state = Arc::new(AppState::new(
        controller,
        PageOptions {
            title: config.display.title.clone(),
            poll_interval_ms: config.display.poll_interval_ms,
        },
    ));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("wallmountd listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("wallmountd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
