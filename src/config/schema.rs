//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! Route entries derive Serde traits for deserialization from the
//! `PROXY_CONFIGURATION` JSON document; everything else is assembled by the
//! loader from individual environment values.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
///
/// Immutable once built. Shared via `Arc`; a reload builds a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Verbosity of the structured logs.
    pub log_level: LogLevel,

    /// Header names shown in request logs.
    pub visible_headers: HeaderList,

    /// Header names copied from the inbound request onto report requests.
    pub header_to_replicate: HeaderList,

    /// Cap on logged and captured body bytes.
    pub body_max_len: usize,

    /// Route definitions, in declaration order.
    pub proxy: Vec<RouteEntry>,

    /// Listener bind address.
    pub listener: Listener,

    /// Dedup and capture settings.
    pub dedup: DedupConfig,

    /// Request timeout for the forwarding path.
    pub timeout: Duration,

    /// Prometheus listener address, if metrics are enabled.
    pub metrics_address: Option<String>,
}

/// Log verbosity accepted in `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of lowercase header names, as configured.
///
/// Repeated names are kept; consumers that act once per header use
/// [`HeaderList::distinct`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderList(Vec<String>);

impl HeaderList {
    /// Split a comma-separated list, dropping empty tokens.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    /// Names in configured order, first occurrence only.
    pub fn distinct(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .enumerate()
            .filter(|(i, name)| !self.0[..*i].contains(name))
            .map(|(_, name)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    /// Host name or IP to bind.
    pub address: String,

    /// TCP port.
    pub port: u16,
}

impl Listener {
    /// `host:port` form accepted by `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 8080,
        }
    }
}

/// Behavior class for a matched request.
///
/// Encoded on the wire as an integer: `0` = Normal, `1` = AsynchronousReport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProxyMode {
    /// Forward only.
    Normal,
    /// Forward, and report the captured response to a secondary upstream.
    AsynchronousReport,
}

impl TryFrom<u8> for ProxyMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProxyMode::Normal),
            1 => Ok(ProxyMode::AsynchronousReport),
            other => Err(format!("unknown proxy mode {other}, expected 0 or 1")),
        }
    }
}

impl From<ProxyMode> for u8 {
    fn from(mode: ProxyMode) -> Self {
        match mode {
            ProxyMode::Normal => 0,
            ProxyMode::AsynchronousReport => 1,
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyMode::Normal => f.write_str("normal"),
            ProxyMode::AsynchronousReport => f.write_str("async_report"),
        }
    }
}

/// One configured forwarding rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteEntry {
    /// Host header to match.
    pub host: String,

    /// Exact paths covered by this rule.
    pub path: Vec<String>,

    /// How matched requests are handled.
    pub mode: ProxyMode,

    /// Upstream base URL (e.g., "http://upstream:9000").
    pub proxy_to: String,
}

/// Dedup marker and capture settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupConfig {
    /// Cookie carrying the session identity.
    pub session_cookie: String,

    /// Directory holding marker and capture files.
    pub directory: PathBuf,

    /// Time bucket folded into identity tokens. `None` uses nanoseconds.
    pub window: Option<Duration>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            session_cookie: "ci_session".to_string(),
            directory: std::env::temp_dir(),
            window: None,
        }
    }
}
