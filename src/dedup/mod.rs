//! Request deduplication subsystem.
//!
//! # Data Flow
//! ```text
//! path + session cookie
//!     → identity.rs (token = alphanumeric base64(md5(...)))
//!     → marker.rs (is the token marked? mark it atomically)
//!     → capture.rs (response body stored next to the marker)
//!     → gate.rs (check / claim / release sequence for the transport)
//!
//! On disk (storage.rs):
//!     <dir>/<token>.flag   marker
//!     <dir>/<token>.body   capture
//! ```
//!
//! # Design Decisions
//! - Marker existence is the only "already reported" state
//! - Markers are created with create-exclusive semantics
//! - Storage failures are per-request errors, never panics

pub mod capture;
pub mod error;
pub mod gate;
pub mod identity;
pub mod marker;
pub mod storage;

pub use capture::CaptureSink;
pub use error::DedupError;
pub use gate::{Admission, Claim, ReportGate};
pub use identity::{IdentityHasher, IdentityToken};
pub use marker::{FileMarkerStore, MarkOutcome, MarkerStore, MemoryMarkerStore};
pub use storage::StorageDir;
