//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Derive the filter from `LOG_LEVEL` unless `RUST_LOG` is set
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Initialized before the configuration is built so its warnings are visible

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{env, validation, LogLevel};

/// Level from the raw `LOG_LEVEL` variable. Invalid values are reported
/// again, as a warning, once the configuration is built.
pub fn level_from_env() -> LogLevel {
    let raw = std::env::var(env::LOG_LEVEL).unwrap_or_default();
    validation::verify_log_level(&raw).0
}

/// Filter directive for the crate and the HTTP middleware.
pub fn default_directive(level: LogLevel) -> String {
    format!("report_proxy={level},tower_http={level}")
}

/// Install the global subscriber. Call once, at startup.
pub fn init(level: LogLevel) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
