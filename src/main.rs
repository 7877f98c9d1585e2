//! report-proxy
//!
//! Forwarding HTTP proxy configured entirely from the environment.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing (host, path)
//!                          │                 │
//!                          │                 ▼
//!                          │          DispatchPlan { primary, reports }
//!                          │                 │
//!                          ▼                 ▼
//!                     dedup gate ◀── report route? ──▶ primary upstream
//!                          │                                 │
//!     Client Response ◀────┼─────────────────────────────────┘
//!                          ▼
//!                 capture + mark ──▶ background report ──▶ report upstream
//! ```

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use report_proxy::config::{self, watcher::ConfigWatcher};
use report_proxy::lifecycle::{signals, Shutdown};
use report_proxy::observability::{logging, metrics};
use report_proxy::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(logging::level_from_env());

    tracing::info!("report-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let env = config::env::capture();
    let config = match config::load_from(&env) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration, refusing to start");
            return Err(e.into());
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        routes = config.proxy.len(),
        log_level = %config.log_level,
        body_max_len = config.body_max_len,
        dedup_dir = %config.dedup.directory.display(),
        "Configuration loaded"
    );

    if let Some(address) = &config.metrics_address {
        match address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %address, "Failed to parse metrics address"),
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (config_tx, config_rx) = mpsc::unbounded_channel();
    let _watcher = match config::route_file(&env) {
        Some(path) => match ConfigWatcher::new(path, env.clone(), config_tx.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::error!(error = %e, "Failed to watch route file, hot reload disabled");
                None
            }
        },
        None => None,
    };
    #[cfg(unix)]
    let _reload = signals::spawn_reload_on_sighup(env, config_tx)?;
    #[cfg(not(unix))]
    drop(config_tx);

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();
    let mut serving = tokio::spawn(server.run(listener, config_rx, shutdown.subscribe()));

    // The server only finishes early if serving itself failed.
    let finished = tokio::select! {
        _ = signals::ctrl_c() => None,
        result = &mut serving => Some(result),
    };
    match finished {
        Some(result) => result??,
        None => {
            shutdown.trigger();
            serving.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
