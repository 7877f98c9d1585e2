//! Location of marker and capture files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::dedup::error::DedupError;
use crate::dedup::identity::IdentityToken;

const MARKER_SUFFIX: &str = ".flag";
const CAPTURE_SUFFIX: &str = ".body";

/// A directory holding one marker and one capture file per token.
#[derive(Debug, Clone)]
pub struct StorageDir {
    root: PathBuf,
}

impl StorageDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The OS temporary directory.
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Create the directory if it does not exist yet.
    pub fn ensure(&self) -> Result<(), DedupError> {
        fs::create_dir_all(&self.root).map_err(|e| DedupError::storage(&self.root, e))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn marker_path(&self, token: &IdentityToken) -> PathBuf {
        self.root.join(format!("{token}{MARKER_SUFFIX}"))
    }

    pub fn capture_path(&self, token: &IdentityToken) -> PathBuf {
        self.root.join(format!("{token}{CAPTURE_SUFFIX}"))
    }
}
