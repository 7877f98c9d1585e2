//! Route file watcher for hot reload.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_from;
use crate::config::schema::Configuration;

/// Rebuilds the configuration whenever the route file changes.
///
/// The parent directory is watched rather than the file itself, so editors
/// that save by renaming a new file into place are picked up too.
pub struct ConfigWatcher {
    path: PathBuf,
    env: HashMap<String, String>,
    update_tx: mpsc::UnboundedSender<Configuration>,
}

impl ConfigWatcher {
    /// `env` is the captured environment the configuration is rebuilt from;
    /// it must name `path` as its route file.
    pub fn new(
        path: PathBuf,
        env: HashMap<String, String>,
        update_tx: mpsc::UnboundedSender<Configuration>,
    ) -> Self {
        Self {
            path,
            env,
            update_tx,
        }
    }

    /// Start watching in a background thread. Dropping the returned watcher
    /// stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            env,
            update_tx,
        } = self;
        let file_name = path.file_name().map(|n| n.to_os_string());
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !touches_file || !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    tracing::info!("Route file change detected, reloading...");
                    match load_from(&env) {
                        Ok(new_config) => {
                            let _ = update_tx.send(new_config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Route file watcher started");
        Ok(watcher)
    }
}
