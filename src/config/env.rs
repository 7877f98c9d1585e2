//! Environment variable names and sources.

use std::collections::HashMap;

pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const VISIBLE_HEADERS: &str = "VISIBLE_HEADERS";
pub const HEADER_TO_REPLICATE: &str = "HEADER_TO_REPLICATE";
pub const LOG_BODY_MAX_SIZE: &str = "LOG_BODY_MAX_SIZE";
pub const PROXY_CONFIGURATION: &str = "PROXY_CONFIGURATION";
pub const PROXY_CONFIGURATION_FILE: &str = "PROXY_CONFIGURATION_FILE";
pub const LISTEN_PORT: &str = "LISTEN_PORT";
pub const LISTEN_HOST: &str = "LISTEN_HOST";

/// Dedup settings
pub const SESSION_COOKIE: &str = "SESSION_COOKIE";
pub const DEDUP_DIR: &str = "DEDUP_DIR";
pub const DEDUP_WINDOW_SECS: &str = "DEDUP_WINDOW_SECS";

/// Transport and observability
pub const PROXY_TIMEOUT_SECS: &str = "PROXY_TIMEOUT_SECS";
pub const METRICS_ADDRESS: &str = "METRICS_ADDRESS";

/// Get all environment variable names for documentation/validation
pub fn all_env_vars() -> &'static [&'static str] {
    &[
        LOG_LEVEL,
        VISIBLE_HEADERS,
        HEADER_TO_REPLICATE,
        LOG_BODY_MAX_SIZE,
        PROXY_CONFIGURATION,
        PROXY_CONFIGURATION_FILE,
        LISTEN_PORT,
        LISTEN_HOST,
        SESSION_COOKIE,
        DEDUP_DIR,
        DEDUP_WINDOW_SECS,
        PROXY_TIMEOUT_SECS,
        METRICS_ADDRESS,
    ]
}

/// A key/value source the configuration is built from.
///
/// Unset and empty values are treated alike by the validators.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Value for `key`, or `""` when unset.
    fn get_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default()
    }
}

/// Copy of every known variable in the process environment.
///
/// The environment of a running process does not change, so startup and
/// every reload build from the same snapshot.
pub fn capture() -> HashMap<String, String> {
    all_env_vars()
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
        .collect()
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|v| v.to_string())
    }
}
