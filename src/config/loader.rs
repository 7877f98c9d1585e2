//! Configuration loading from the environment.
//!
//! The route list comes from `PROXY_CONFIGURATION_FILE` when it is set and
//! from `PROXY_CONFIGURATION` otherwise. Only the file can change while the
//! process runs, so only the file is worth reloading.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::env::{self, EnvSource};
use crate::config::schema::{Configuration, DedupConfig, RouteEntry};
use crate::config::validation::{self, ConfigWarning, RouteError};

/// Error type for configuration loading.
///
/// Only the route list can fail; everything else falls back to a default.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PROXY_CONFIGURATION is not set")]
    MissingRoutes,

    #[error("Failed to read route file {}: {source}", path.display())]
    RouteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing PROXY_CONFIGURATION: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<RouteError>),
}

fn join_errors(errors: &[RouteError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A built configuration plus the defaults that were substituted.
#[derive(Debug, Clone)]
pub struct LoadedConfiguration {
    pub config: Configuration,
    pub warnings: Vec<ConfigWarning>,
}

/// Parse the JSON route list.
pub fn parse_routes(raw: &str) -> Result<Vec<RouteEntry>, ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::MissingRoutes);
    }
    Ok(serde_json::from_str(raw)?)
}

/// Build a configuration from any key/value source.
///
/// Warnings are returned to the caller and not logged.
pub fn build_configuration(source: &impl EnvSource) -> Result<LoadedConfiguration, ConfigError> {
    let mut warnings = Vec::new();
    let mut note = |warning: Option<ConfigWarning>| warnings.extend(warning);

    let (log_level, w) = validation::verify_log_level(&source.get_or_empty(env::LOG_LEVEL));
    note(w);
    let (body_max_len, w) =
        validation::verify_body_max_len(&source.get_or_empty(env::LOG_BODY_MAX_SIZE));
    note(w);
    let (listener, w) = validation::verify_listener(
        &source.get_or_empty(env::LISTEN_PORT),
        &source.get_or_empty(env::LISTEN_HOST),
    );
    note(w);
    let (window, w) =
        validation::verify_dedup_window(&source.get_or_empty(env::DEDUP_WINDOW_SECS));
    note(w);
    let (timeout, w) = validation::verify_timeout(&source.get_or_empty(env::PROXY_TIMEOUT_SECS));
    note(w);

    let proxy = parse_routes(&raw_routes(source)?)?;
    let route_warnings = validation::validate_routes(&proxy).map_err(ConfigError::Validation)?;
    warnings.extend(route_warnings);

    let config = Configuration {
        log_level,
        visible_headers: validation::verify_visible_headers(
            &source.get_or_empty(env::VISIBLE_HEADERS),
        ),
        header_to_replicate: validation::verify_header_to_replicate(
            &source.get_or_empty(env::HEADER_TO_REPLICATE),
        ),
        body_max_len,
        proxy,
        listener,
        dedup: DedupConfig {
            session_cookie: validation::verify_session_cookie(
                &source.get_or_empty(env::SESSION_COOKIE),
            ),
            directory: validation::verify_dedup_dir(&source.get_or_empty(env::DEDUP_DIR)),
            window,
        },
        timeout,
        metrics_address: validation::verify_metrics_address(
            &source.get_or_empty(env::METRICS_ADDRESS),
        ),
    };

    Ok(LoadedConfiguration { config, warnings })
}

/// Route JSON from the route file if one is configured, else the variable.
fn raw_routes(source: &impl EnvSource) -> Result<String, ConfigError> {
    match route_file(source) {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::RouteFile { path, source }),
        None => Ok(source.get_or_empty(env::PROXY_CONFIGURATION)),
    }
}

/// The configured route file, if any.
pub fn route_file(source: &impl EnvSource) -> Option<PathBuf> {
    let raw = source.get_or_empty(env::PROXY_CONFIGURATION_FILE);
    let raw = raw.trim();
    (!raw.is_empty()).then(|| PathBuf::from(raw))
}

/// Build the configuration and log every substituted default.
pub fn load_from(source: &impl EnvSource) -> Result<Configuration, ConfigError> {
    let loaded = build_configuration(source)?;
    for warning in &loaded.warnings {
        tracing::warn!(%warning, "Configuration default substituted");
    }
    Ok(loaded.config)
}
