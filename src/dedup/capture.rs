//! Captured response bodies, addressed by identity token.

use std::fs;
use std::io::ErrorKind;

use crate::dedup::error::DedupError;
use crate::dedup::identity::IdentityToken;
use crate::dedup::storage::StorageDir;

/// Persists response bodies as `<token>.body` files.
///
/// No size limit is applied here; callers truncate before capturing.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    storage: StorageDir,
}

impl CaptureSink {
    pub fn new(storage: StorageDir) -> Self {
        Self { storage }
    }

    /// Write `body`, replacing any earlier capture for the token.
    pub fn capture(&self, token: &IdentityToken, body: &[u8]) -> Result<(), DedupError> {
        let path = self.storage.capture_path(token);
        fs::write(&path, body).map_err(|e| DedupError::storage(path, e))
    }

    pub fn retrieve(&self, token: &IdentityToken) -> Result<Vec<u8>, DedupError> {
        let path = self.storage.capture_path(token);
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DedupError::NotFound {
                token: token.to_string(),
            },
            _ => DedupError::storage(path, e),
        })
    }

    pub fn delete(&self, token: &IdentityToken) -> Result<(), DedupError> {
        let path = self.storage.capture_path(token);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DedupError::NotFound {
                token: token.to_string(),
            },
            _ => DedupError::storage(path, e),
        })
    }
}
