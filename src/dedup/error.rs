//! Dedup error definitions.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the identity hasher, marker store and capture sink.
///
/// All are per-request; none is fatal to the process.
#[derive(Debug, Error)]
pub enum DedupError {
    /// The session cookie needed to build an identity token is absent.
    #[error("Missing identity input: cookie {cookie:?} not present")]
    MissingIdentityInput { cookie: String },

    /// The backing location could not be read or written.
    #[error("Storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No marker or capture exists for the token.
    #[error("No entry for token {token}")]
    NotFound { token: String },
}

impl DedupError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DedupError::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DedupError::NotFound { .. })
    }
}
