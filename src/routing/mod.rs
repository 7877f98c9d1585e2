//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → shared.rs (current config + table snapshot)
//!     → table.rs (exact (host, path) lookup)
//!     → plan.rs (primary upstream + report targets)
//!     → Return: DispatchPlan or NoMatch
//!
//! Route Compilation (at startup and on reload):
//!     RouteEntry[]
//!     → Index every (mode, upstream, host, path)
//!     → Freeze as immutable RouteTable
//!     → Publish atomically
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact matching only, no prefixes or regex
//! - Deterministic: matches come back in route declaration order
//! - All matches returned; no implicit priority

pub mod plan;
pub mod shared;
pub mod table;

pub use plan::{resolve_request, DispatchPlan};
pub use shared::{SharedSnapshot, Snapshot};
pub use table::{RouteMatch, RouteTable};
