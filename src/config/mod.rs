//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment (LOG_LEVEL, PROXY_CONFIGURATION, ...)
//!     → env.rs (variable names, EnvSource)
//!     → validation.rs (per-field defaults & warnings, route checks)
//!     → loader.rs (assemble Configuration, fail on bad routes)
//!     → Configuration (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On reload (route file change or SIGHUP):
//!     watcher.rs rebuilds from the captured environment + route file
//!     → routing::shared publishes config + route table atomically
//!     → in-flight requests keep the snapshot they started with
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - Every field except the route list has a default
//! - A malformed route list is fatal at startup and rejected on reload

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{build_configuration, load_from, route_file, ConfigError, LoadedConfiguration};
pub use schema::{Configuration, DedupConfig, HeaderList, Listener, LogLevel, ProxyMode, RouteEntry};
pub use validation::ConfigWarning;
