//! Configuration validation.
//!
//! # Responsibilities
//! - Check each raw environment value and substitute its documented default
//! - Report malformed-but-recoverable values as warnings, not failures
//! - Reject route lists that are unsafe to run with
//!
//! # Design Decisions
//! - Validators are pure functions: raw value -> (value, optional warning)
//! - Route validation returns all problems, not just the first
//! - Only the route list can fail construction

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::{HeaderList, Listener, LogLevel, RouteEntry};

pub const DEFAULT_VISIBLE_HEADERS: &str =
    "host,x-request-id,x-real-ip,content-length,user-agent,accept-encoding,content-type,custom-app-headers";
pub const DEFAULT_BODY_MAX_LEN: usize = 255;
pub const DEFAULT_LISTEN_HOST: &str = "localhost";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;
pub const DEFAULT_SESSION_COOKIE: &str = "ci_session";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A recoverable configuration problem. The default was used instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    #[error("Invalid LOG_LEVEL {0:?}, using info")]
    LogLevel(String),

    #[error("Invalid LOG_BODY_MAX_SIZE {0:?}, using 255")]
    BodyMaxLen(String),

    #[error("Invalid LISTEN_PORT {0:?}, using 8080")]
    ListenPort(String),

    #[error("Invalid DEDUP_WINDOW_SECS {0:?}, using nanosecond timestamps")]
    DedupWindow(String),

    #[error("Invalid PROXY_TIMEOUT_SECS {0:?}, using 30")]
    Timeout(String),

    #[error("Route {index} for host {host:?} declares no paths")]
    EmptyRoute { index: usize, host: String },
}

/// A semantic problem with one route entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route {index}: host is empty")]
    EmptyHost { index: usize },

    #[error("route {index}: proxy_to {proxy_to:?} is not an absolute http(s) URL")]
    InvalidUpstream { index: usize, proxy_to: String },
}

/// Case-insensitive match against the known levels; anything else is `info`.
pub fn verify_log_level(raw: &str) -> (LogLevel, Option<ConfigWarning>) {
    if raw.is_empty() {
        return (LogLevel::Info, None);
    }
    match raw.parse() {
        Ok(level) => (level, None),
        Err(()) => (LogLevel::Info, Some(ConfigWarning::LogLevel(raw.to_string()))),
    }
}

/// Non-empty values pass through; empty falls back to the common header set.
pub fn verify_visible_headers(raw: &str) -> HeaderList {
    if raw.trim().is_empty() {
        HeaderList::parse(DEFAULT_VISIBLE_HEADERS)
    } else {
        HeaderList::parse(raw)
    }
}

/// An empty list is a valid setting, not an error.
pub fn verify_header_to_replicate(raw: &str) -> HeaderList {
    HeaderList::parse(raw)
}

pub fn verify_body_max_len(raw: &str) -> (usize, Option<ConfigWarning>) {
    match raw.trim().parse::<usize>() {
        Ok(len) => (len, None),
        Err(_) => (
            DEFAULT_BODY_MAX_LEN,
            Some(ConfigWarning::BodyMaxLen(raw.to_string())),
        ),
    }
}

pub fn verify_listener(raw_port: &str, raw_host: &str) -> (Listener, Option<ConfigWarning>) {
    let address = if raw_host.trim().is_empty() {
        DEFAULT_LISTEN_HOST.to_string()
    } else {
        raw_host.trim().to_string()
    };

    let (port, warning) = match raw_port.trim().parse::<u16>() {
        Ok(port) => (port, None),
        Err(_) => (
            DEFAULT_LISTEN_PORT,
            Some(ConfigWarning::ListenPort(raw_port.to_string())),
        ),
    };

    (Listener { address, port }, warning)
}

pub fn verify_session_cookie(raw: &str) -> String {
    if raw.trim().is_empty() {
        DEFAULT_SESSION_COOKIE.to_string()
    } else {
        raw.trim().to_string()
    }
}

pub fn verify_dedup_dir(raw: &str) -> PathBuf {
    if raw.trim().is_empty() {
        std::env::temp_dir()
    } else {
        PathBuf::from(raw.trim())
    }
}

/// `0` or unset means no bucketing.
pub fn verify_dedup_window(raw: &str) -> (Option<Duration>, Option<ConfigWarning>) {
    if raw.trim().is_empty() {
        return (None, None);
    }
    match raw.trim().parse::<u64>() {
        Ok(0) => (None, None),
        Ok(secs) => (Some(Duration::from_secs(secs)), None),
        Err(_) => (None, Some(ConfigWarning::DedupWindow(raw.to_string()))),
    }
}

pub fn verify_timeout(raw: &str) -> (Duration, Option<ConfigWarning>) {
    let default = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    if raw.trim().is_empty() {
        return (default, None);
    }
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => (Duration::from_secs(secs), None),
        _ => (default, Some(ConfigWarning::Timeout(raw.to_string()))),
    }
}

pub fn verify_metrics_address(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

/// Check every route. Entries without paths are kept but reported.
pub fn validate_routes(routes: &[RouteEntry]) -> Result<Vec<ConfigWarning>, Vec<RouteError>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (index, route) in routes.iter().enumerate() {
        if route.host.trim().is_empty() {
            errors.push(RouteError::EmptyHost { index });
        }

        let valid_upstream = Url::parse(&route.proxy_to)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !valid_upstream {
            errors.push(RouteError::InvalidUpstream {
                index,
                proxy_to: route.proxy_to.clone(),
            });
        }

        if route.path.is_empty() {
            warnings.push(ConfigWarning::EmptyRoute {
                index,
                host: route.host.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(errors)
    }
}
