//! HTTP transport glue around the routing and dedup core.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → routing (resolve host + path → DispatchPlan)
//!     → dedup gate check (report routes only)
//!     → upstream.rs (forward to primary upstream)
//!     → headers.rs (strip hop-by-hop)
//!     → capture.rs (stream to client, keep the first LOG_BODY_MAX_SIZE bytes)
//!     → report.rs (claim at end of body, background POST to report targets)
//! ```

pub mod capture;
pub mod headers;
pub mod report;
pub mod server;
pub mod upstream;

pub use headers::{X_REPORT_TOKEN, X_REQUEST_ID};
pub use report::{ReportError, ReportJob, Reporter};
pub use server::{AppState, HttpServer};
