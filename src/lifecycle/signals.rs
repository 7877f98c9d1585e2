//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for Ctrl+C to start a graceful shutdown
//! - Rebuild the configuration on SIGHUP and hand it to the server
//!
//! A rebuild re-reads `PROXY_CONFIGURATION_FILE`; the captured environment
//! itself never changes, so without a route file SIGHUP republishes the
//! same routes.

#[cfg(unix)]
use std::collections::HashMap;

#[cfg(unix)]
use tokio::{sync::mpsc, task::JoinHandle};

#[cfg(unix)]
use crate::config::{self, Configuration};

/// Wait for Ctrl+C. If the handler cannot be installed, wait forever.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Rebuild from `env` on every SIGHUP and send the result to `updates`.
/// A configuration that fails to load is logged and dropped.
#[cfg(unix)]
pub fn spawn_reload_on_sighup(
    env: HashMap<String, String>,
    updates: mpsc::UnboundedSender<Configuration>,
) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            tracing::info!("SIGHUP received, reloading configuration");
            match config::load_from(&env) {
                Ok(new_config) => {
                    if updates.send(new_config).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
                }
            }
        }
    }))
}
