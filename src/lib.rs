//! Forwarding HTTP proxy with deduplicated asynchronous reporting.
//!
//! Requests are matched against a route table built from
//! `PROXY_CONFIGURATION`. A match is forwarded to its upstream; routes in
//! asynchronous-report mode also hand the captured response to a report
//! upstream, at most once per identity token.

// Core subsystems
pub mod config;
pub mod dedup;
pub mod routing;

// Transport
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::Configuration;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
