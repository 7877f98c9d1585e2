//! Atomically published configuration and route table.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::Configuration;
use crate::routing::table::RouteTable;

/// A configuration and the route table derived from it.
#[derive(Debug)]
pub struct Snapshot {
    pub config: Arc<Configuration>,
    pub table: RouteTable,
}

impl Snapshot {
    pub fn new(config: Configuration) -> Self {
        let table = RouteTable::build(&config.proxy);
        Self {
            config: Arc::new(config),
            table,
        }
    }
}

/// Holder for the live snapshot.
///
/// Readers get a fully-formed snapshot; a reload replaces it wholesale.
#[derive(Debug)]
pub struct SharedSnapshot {
    inner: ArcSwap<Snapshot>,
}

impl SharedSnapshot {
    pub fn new(config: Configuration) -> Self {
        Self {
            inner: ArcSwap::from_pointee(Snapshot::new(config)),
        }
    }

    /// Current snapshot. Held for the duration of one request.
    pub fn load(&self) -> Arc<Snapshot> {
        self.inner.load_full()
    }

    /// Build a new table from `config` and publish both.
    ///
    /// Settings bound at startup (listener, dedup store, timeout layer, log
    /// filter, metrics endpoint) keep their running values; a change to any
    /// of them is logged and ignored until restart.
    pub fn publish(&self, mut config: Configuration) {
        pin_startup_settings(&self.load().config, &mut config);
        let snapshot = Snapshot::new(config);
        tracing::info!(
            routes = snapshot.config.proxy.len(),
            rules = snapshot.table.len(),
            "Publishing new route table"
        );
        self.inner.store(Arc::new(snapshot));
    }
}

fn pin_startup_settings(current: &Configuration, next: &mut Configuration) {
    fn keep<T: PartialEq + Clone>(name: &str, current: &T, next: &mut T) {
        if current != next {
            tracing::warn!(setting = name, "Setting cannot change without a restart, keeping current value");
            *next = current.clone();
        }
    }

    keep("listener", &current.listener, &mut next.listener);
    keep("dedup", &current.dedup, &mut next.dedup);
    keep("timeout", &current.timeout, &mut next.timeout);
    keep("log_level", &current.log_level, &mut next.log_level);
    keep("metrics_address", &current.metrics_address, &mut next.metrics_address);
}
