//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Logging → Load config → Dedup dir → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → Shutdown::trigger → server stops accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGINT → graceful shutdown
//!     SIGHUP → rebuild config from the environment and publish it
//! ```
//!
//! # Design Decisions
//! - Fail fast: an invalid route list at startup is fatal
//! - An invalid route list on reload keeps the current snapshot

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
